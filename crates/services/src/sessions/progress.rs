/// Aggregated view of a student's session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentProgress {
    pub total_sections: usize,
    pub completed_sections: usize,
    pub current_section: usize,
    pub resume_index: usize,
    pub can_advance: bool,
    pub can_retreat: bool,
}

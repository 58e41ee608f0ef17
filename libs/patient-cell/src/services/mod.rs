pub mod history;
pub mod notes;
pub mod patient;

pub use history::ConsultationHistoryService;
pub use notes::PatientNoteService;
pub use patient::PatientService;

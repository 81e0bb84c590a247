// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{exit_code, load_targets, load_targets_from_file, scan_options_from_matches};

// Re-export scan functionality from reflector-core
pub use reflector_core::{ReportFormat, ScanOptions, ScanSummary, execute_scan};

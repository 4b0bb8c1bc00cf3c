pub mod due;
pub mod sm2;

pub use due::{count_due, due_or_all, is_due, select_due};
pub use sm2::{apply_review, update};

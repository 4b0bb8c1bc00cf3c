pub mod card;
pub mod review;
pub mod session;

pub use card::{Flashcard, FlashcardSet, NewSet, SetStatus, SetUpdate, User};
pub use review::{Quality, ReviewState};
pub use session::{CorrectStreak, Leaderboard, SessionCompletion, StudySession};

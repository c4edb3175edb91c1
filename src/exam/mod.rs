pub mod record;
pub mod review;
pub mod session;
pub mod timer;

pub use record::{AnswerRow, ExamRecord};
pub use review::ReviewCursor;
pub use session::{ExamPhase, ExamSession, SessionError};
pub use timer::{ExamTimer, TimerMode, TimerUrgency};

pub mod config;
pub mod similarity;

mod answers;
pub use answers::{AnswerSet, MATCH_THRESHOLD};

mod round;
pub use round::{GuessMessage, GuesserId, MessageId, Round, RoundEvent, RoundInput, RoundResult};

mod score;
pub use score::{ScoreBoard, format_standings};

mod session;
pub use session::{
    GameError, Session, SessionEvent, SessionInput, SessionOptions, SessionStatus, TrackSource,
    select_tracks,
};

mod registry;
pub use registry::{SessionKey, SessionRegistry, SessionSlot};

use earworm_spotify::Track;
use serde::{Deserialize, Serialize};

use crate::answers::AnswerSet;

/// A participant ID, as issued by the host's message surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GuesserId(pub String);
impl std::fmt::Display for GuesserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message ID, used to key reactions and replies back to a guess.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// One incoming message from the host's message surface.
#[derive(Debug, Clone)]
pub struct GuessMessage {
    /// The message's ID.
    pub id: MessageId,
    /// Who sent it.
    pub sender: GuesserId,
    /// The raw message text.
    pub text: String,
    /// Whether the sender is the system's own identity. Such messages are
    /// never judged or scored.
    pub from_system: bool,
}

/// A typed transition input for a round.
#[derive(Debug, Clone)]
pub enum RoundInput {
    /// A participant sent a message while the round was open.
    Guess(GuessMessage),
    /// The preview finished playing.
    PlaybackEnded,
}

/// An ordered output of applying one input to a round.
#[derive(Debug, Clone, PartialEq)]
pub enum RoundEvent {
    /// Someone guessed, correctly or not. Emitted before judging so the
    /// score table can seed a zero entry for every participant.
    GuessReceived {
        /// Who guessed.
        guesser: GuesserId,
    },
    /// The title has been credited to this guesser.
    TitleAttributed {
        /// The message that earned the attribution.
        message: MessageId,
        /// Who guessed it.
        guesser: GuesserId,
    },
    /// The artist has been credited to this guesser.
    ArtistAttributed {
        /// The message that earned the attribution.
        message: MessageId,
        /// Who guessed it.
        guesser: GuesserId,
    },
    /// The message matched neither the title nor the artist.
    Incorrect {
        /// The message to mark as wrong.
        message: MessageId,
    },
    /// The round is over. Emitted exactly once.
    Closed(RoundResult),
}

/// Who, if anyone, was credited with the title and artist when the round
/// closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoundResult {
    /// The participant credited with the title.
    pub title_guesser: Option<GuesserId>,
    /// The participant credited with the artist.
    pub artist_guesser: Option<GuesserId>,
}

/// The unit of play for one track: guess collection plus closure.
///
/// `Open` until either both kinds are attributed or playback ends; `Closed`
/// is terminal, and further inputs (including a second playback-ended
/// signal) produce nothing.
pub struct Round {
    track: Track,
    answers: AnswerSet,
    title_guesser: Option<GuesserId>,
    artist_guesser: Option<GuesserId>,
    closed: bool,
}

impl Round {
    /// Wrap a track for play, deriving its answer set.
    pub fn new(track: Track) -> Self {
        let answers = AnswerSet::build(&track);
        Self {
            track,
            answers,
            title_guesser: None,
            artist_guesser: None,
            closed: false,
        }
    }

    /// The track being played.
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Whether the round has reached its terminal state.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The current attribution state.
    pub fn result(&self) -> RoundResult {
        RoundResult {
            title_guesser: self.title_guesser.clone(),
            artist_guesser: self.artist_guesser.clone(),
        }
    }

    /// Apply one input, returning the events it produced in order.
    /// Attribution is first-come-first-served in input order; each kind is
    /// credited at most once per round.
    pub fn apply(&mut self, input: RoundInput) -> Vec<RoundEvent> {
        if self.closed {
            return vec![];
        }

        match input {
            RoundInput::PlaybackEnded => {
                self.closed = true;
                tracing::debug!("round closed by playback end: {:?}", self.result());
                vec![RoundEvent::Closed(self.result())]
            }
            RoundInput::Guess(message) => self.apply_guess(message),
        }
    }

    fn apply_guess(&mut self, message: GuessMessage) -> Vec<RoundEvent> {
        if message.from_system {
            return vec![];
        }

        let mut events = vec![RoundEvent::GuessReceived {
            guesser: message.sender.clone(),
        }];

        let title_correct =
            self.title_guesser.is_none() && self.answers.matches_title(&message.text);
        let artist_correct =
            self.artist_guesser.is_none() && self.answers.matches_artist(&message.text);

        if title_correct {
            self.title_guesser = Some(message.sender.clone());
            events.push(RoundEvent::TitleAttributed {
                message: message.id.clone(),
                guesser: message.sender.clone(),
            });
        }
        if artist_correct {
            self.artist_guesser = Some(message.sender.clone());
            events.push(RoundEvent::ArtistAttributed {
                message: message.id.clone(),
                guesser: message.sender.clone(),
            });
        }
        if !(title_correct || artist_correct) {
            events.push(RoundEvent::Incorrect {
                message: message.id,
            });
        }

        if self.title_guesser.is_some() && self.artist_guesser.is_some() {
            self.closed = true;
            tracing::debug!("round closed by attribution: {:?}", self.result());
            events.push(RoundEvent::Closed(self.result()));
        }

        events
    }
}

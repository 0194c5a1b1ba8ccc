use earworm_spotify::{Client, ClientError, FetchProgress, PlaylistMetadata, Track};
use rand::{Rng, seq::SliceRandom};
use tokio::sync::mpsc;

use crate::{
    config::Config,
    round::{GuessMessage, GuesserId, MessageId, Round, RoundEvent, RoundInput},
    score::ScoreBoard,
};

/// An error that ends a session before its rounds complete.
#[derive(Debug)]
pub enum GameError {
    /// The catalog fetch failed structurally (auth, malformed reference).
    Catalog(ClientError),
    /// The fetch finished but yielded nothing playable.
    NoPlayableTracks,
    /// The host dropped the input stream mid-game; the session was abandoned.
    InputStreamClosed,
}
impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameError::Catalog(e) => write!(f, "catalog fetch failed: {e}"),
            GameError::NoPlayableTracks => write!(f, "playlist has no playable tracks"),
            GameError::InputStreamClosed => write!(f, "input stream closed before the game ended"),
        }
    }
}
impl std::error::Error for GameError {}
impl From<ClientError> for GameError {
    fn from(e: ClientError) -> Self {
        GameError::Catalog(e)
    }
}

/// Where a playlist's tracks come from. Implemented by the Spotify client;
/// tests substitute a canned source.
pub trait TrackSource {
    /// Fetch summary metadata for the playlist.
    fn metadata(
        &self,
        reference: &str,
    ) -> impl Future<Output = Result<PlaylistMetadata, ClientError>>;

    /// Fetch the playlist's playable tracks, reporting progress on the
    /// given channel.
    fn fetch(
        &self,
        reference: &str,
        progress: mpsc::UnboundedSender<FetchProgress>,
    ) -> impl Future<Output = Result<Vec<Track>, ClientError>>;
}

impl TrackSource for Client {
    async fn metadata(&self, reference: &str) -> Result<PlaylistMetadata, ClientError> {
        self.playlist_metadata(reference).await
    }

    async fn fetch(
        &self,
        reference: &str,
        progress: mpsc::UnboundedSender<FetchProgress>,
    ) -> Result<Vec<Track>, ClientError> {
        self.playlist_tracks(reference, &progress).await
    }
}

/// Uniform sampling without replacement: shuffle, then keep the prefix.
pub fn select_tracks(mut pool: Vec<Track>, count: usize, rng: &mut impl Rng) -> Vec<Track> {
    pool.shuffle(rng);
    pool.truncate(count);
    pool
}

/// The lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Resolving the requested track count and playlist reference.
    Initializing,
    /// Retrieving the catalog.
    Fetching,
    /// Driving rounds, one at a time.
    Playing,
    /// Terminal; final standings have been emitted.
    Finished,
}

/// Per-invocation overrides; anything absent falls back to configuration.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Playlist reference (bare id or share URL) to play from.
    pub playlist: Option<String>,
    /// How many tracks to play.
    pub length: Option<usize>,
}

/// A typed transition input for the session, fed by the host.
#[derive(Debug, Clone)]
pub enum SessionInput {
    /// A message arrived on the host's message surface.
    Guess(GuessMessage),
    /// The preview for the given round (1-based) finished playing.
    /// Signals carrying an older round number are stale and ignored.
    PlaybackEnded {
        /// Which round's playback ended.
        round: usize,
    },
}

/// Everything the host renders, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The catalog fetch began for this playlist.
    FetchStarted {
        /// Summary metadata, for the "fetching…" display.
        metadata: PlaylistMetadata,
    },
    /// A running count of tracks fetched so far.
    FetchProgress {
        /// Playable tracks fetched so far.
        fetched: usize,
    },
    /// The catalog fetch finished.
    FetchFinished {
        /// The true total of playable tracks.
        total: usize,
    },
    /// A round began; the host should play the preview and, when it ends,
    /// send back [`SessionInput::PlaybackEnded`] with this round number.
    RoundStarted {
        /// 1-based round number.
        round: usize,
        /// Total rounds in the session.
        total: usize,
        /// The preview audio to play.
        preview_url: String,
    },
    /// A guesser took the title.
    TitleAttributed {
        /// 1-based round number.
        round: usize,
        /// The message to acknowledge.
        message: MessageId,
        /// Who took it.
        guesser: GuesserId,
    },
    /// A guesser took the artist.
    ArtistAttributed {
        /// 1-based round number.
        round: usize,
        /// The message to acknowledge.
        message: MessageId,
        /// Who took it.
        guesser: GuesserId,
    },
    /// A guess matched nothing.
    IncorrectGuess {
        /// The message to mark as wrong.
        message: MessageId,
    },
    /// A round closed; reveal the track and show the running standings.
    RoundFinished {
        /// 1-based round number.
        round: usize,
        /// Total rounds in the session.
        total: usize,
        /// The revealed track title.
        title: String,
        /// The revealed artists, joined with " & ".
        artists: String,
        /// Album art for the reveal, if any.
        album_art_url: Option<String>,
        /// Standings after scoring this round.
        standings: Vec<(GuesserId, u32)>,
    },
    /// The session is over.
    Finished {
        /// Final standings.
        standings: Vec<(GuesserId, u32)>,
    },
}

/// One full game: fetch, sample, then drive rounds strictly sequentially,
/// scoring each as it closes.
///
/// The session holds no global state; mutual exclusion per channel is the
/// caller's job via [`crate::SessionRegistry`].
pub struct Session<S> {
    source: S,
    playlist: String,
    length: usize,
    status: SessionStatus,
    scores: ScoreBoard,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<S: TrackSource> Session<S> {
    /// Create a session, defaulting the playlist and length from
    /// configuration when the invocation didn't supply them.
    pub fn new(
        source: S,
        options: SessionOptions,
        config: &Config,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            source,
            // An empty or zero override means "not provided".
            playlist: options
                .playlist
                .filter(|playlist| !playlist.is_empty())
                .unwrap_or_else(|| config.game.default_playlist.clone()),
            length: options
                .length
                .filter(|&length| length > 0)
                .unwrap_or(config.game.length),
            status: SessionStatus::Initializing,
            scores: ScoreBoard::new(),
            events,
        }
    }

    /// Run the game to completion, returning the final standings.
    ///
    /// # Errors
    ///
    /// Fails visibly if the catalog fetch fails structurally, yields nothing
    /// playable, or the host drops the input stream mid-game.
    pub async fn run(
        mut self,
        mut inputs: mpsc::UnboundedReceiver<SessionInput>,
    ) -> Result<Vec<(GuesserId, u32)>, GameError> {
        let tracks = self.fetch_tracks().await?;

        let selected = select_tracks(tracks, self.length, &mut rand::rng());
        let total = selected.len();
        tracing::info!("starting game with {total} rounds");

        self.set_status(SessionStatus::Playing);
        for (index, track) in selected.into_iter().enumerate() {
            let number = index + 1;
            self.play_round(number, total, track, &mut inputs).await?;
        }

        self.set_status(SessionStatus::Finished);
        let standings = self.scores.standings();
        self.emit(SessionEvent::Finished {
            standings: standings.clone(),
        });
        Ok(standings)
    }

    async fn fetch_tracks(&mut self) -> Result<Vec<Track>, GameError> {
        self.set_status(SessionStatus::Fetching);

        let metadata = self.source.metadata(&self.playlist).await?;
        tracing::info!(
            "fetching playlist {:?} ({} tracks)",
            metadata.name,
            metadata.total_tracks
        );
        self.emit(SessionEvent::FetchStarted { metadata });

        // Progress notifications are forwarded as they arrive; the channel
        // closes when the fetch future drops its sender.
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
        let events = self.events.clone();
        let forward = async move {
            while let Some(progress) = progress_rx.recv().await {
                let event = match progress {
                    FetchProgress::Fetched(fetched) => SessionEvent::FetchProgress { fetched },
                    FetchProgress::Complete(total) => SessionEvent::FetchFinished { total },
                };
                let _ = events.send(event);
            }
        };
        let (tracks, ()) = tokio::join!(self.source.fetch(&self.playlist, progress_tx), forward);
        let tracks = tracks?;

        if tracks.is_empty() {
            return Err(GameError::NoPlayableTracks);
        }
        Ok(tracks)
    }

    async fn play_round(
        &mut self,
        number: usize,
        total: usize,
        track: Track,
        inputs: &mut mpsc::UnboundedReceiver<SessionInput>,
    ) -> Result<(), GameError> {
        let mut round = Round::new(track);
        self.emit(SessionEvent::RoundStarted {
            round: number,
            total,
            preview_url: round.track().preview_url.clone(),
        });

        while !round.is_closed() {
            let Some(input) = inputs.recv().await else {
                return Err(GameError::InputStreamClosed);
            };
            let round_input = match input {
                SessionInput::Guess(message) => RoundInput::Guess(message),
                SessionInput::PlaybackEnded { round } if round == number => {
                    RoundInput::PlaybackEnded
                }
                SessionInput::PlaybackEnded { round } => {
                    // Stale signal from an earlier round's preview.
                    tracing::debug!("ignoring playback-ended for round {round} during {number}");
                    continue;
                }
            };

            for event in round.apply(round_input) {
                match event {
                    RoundEvent::GuessReceived { guesser } => self.scores.ensure_entry(&guesser),
                    RoundEvent::TitleAttributed { message, guesser } => {
                        self.emit(SessionEvent::TitleAttributed {
                            round: number,
                            message,
                            guesser,
                        });
                    }
                    RoundEvent::ArtistAttributed { message, guesser } => {
                        self.emit(SessionEvent::ArtistAttributed {
                            round: number,
                            message,
                            guesser,
                        });
                    }
                    RoundEvent::Incorrect { message } => {
                        self.emit(SessionEvent::IncorrectGuess { message });
                    }
                    RoundEvent::Closed(result) => {
                        self.scores.apply_round(&result);
                        let track = round.track();
                        self.emit(SessionEvent::RoundFinished {
                            round: number,
                            total,
                            title: track.title.clone(),
                            artists: track
                                .artists
                                .iter()
                                .map(|a| a.name.as_str())
                                .collect::<Vec<_>>()
                                .join(" & "),
                            album_art_url: track.album_art_url.clone(),
                            standings: self.scores.standings(),
                        });
                    }
                }
            }
        }

        Ok(())
    }

    fn set_status(&mut self, status: SessionStatus) {
        tracing::debug!("session status: {:?} -> {status:?}", self.status);
        self.status = status;
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use earworm_spotify::{Artist, TrackId};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn track(id: &str, title: &str, artist: &str) -> Track {
        Track {
            id: TrackId(id.to_string()),
            title: title.to_string(),
            artists: vec![Artist {
                name: artist.to_string(),
            }],
            preview_url: format!("https://p.scdn.co/mp3-preview/{id}"),
            album_art_url: None,
        }
    }

    struct StubSource {
        tracks: Vec<Track>,
    }
    impl TrackSource for StubSource {
        async fn metadata(&self, _reference: &str) -> Result<PlaylistMetadata, ClientError> {
            Ok(PlaylistMetadata {
                name: "Test Playlist".to_string(),
                image_url: None,
                total_tracks: self.tracks.len() as u32,
                followers: 0,
            })
        }

        async fn fetch(
            &self,
            _reference: &str,
            progress: mpsc::UnboundedSender<FetchProgress>,
        ) -> Result<Vec<Track>, ClientError> {
            let _ = progress.send(FetchProgress::Complete(self.tracks.len()));
            Ok(self.tracks.clone())
        }
    }

    fn guess(sender: &str, text: &str) -> SessionInput {
        SessionInput::Guess(GuessMessage {
            id: MessageId(format!("m-{sender}-{text}")),
            sender: GuesserId(sender.to_string()),
            text: text.to_string(),
            from_system: false,
        })
    }

    fn session(
        tracks: Vec<Track>,
        options: SessionOptions,
    ) -> (
        Session<StubSource>,
        mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Session::new(
            StubSource { tracks },
            options,
            &Config::default(),
            events_tx,
        );
        (session, events_rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut out = vec![];
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn sweep_scores_three_points() {
        let (session, mut events_rx) = session(
            vec![track("t1", "Test", "A & B")],
            SessionOptions {
                playlist: Some("p".to_string()),
                length: Some(1),
            },
        );

        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        inputs_tx.send(guess("alice", "test")).unwrap();
        inputs_tx.send(guess("alice", "a")).unwrap();

        let standings = session.run(inputs_rx).await.unwrap();
        assert_eq!(standings, vec![(GuesserId("alice".to_string()), 3)]);

        let events = drain(&mut events_rx);
        assert!(matches!(events.first(), Some(SessionEvent::FetchStarted { .. })));
        assert!(events.iter().any(|e| matches!(
            e,
            SessionEvent::RoundStarted { round: 1, total: 1, .. }
        )));
        assert!(matches!(events.last(), Some(SessionEvent::Finished { .. })));
    }

    #[tokio::test]
    async fn split_attributions_score_one_each_and_stale_signals_are_ignored() {
        // Two tracks with the same answers, so the shuffled order can't
        // change what the guesses mean.
        let (session, mut events_rx) = session(
            vec![track("t1", "Same", "X"), track("t2", "Same", "X")],
            SessionOptions {
                playlist: Some("p".to_string()),
                length: None, // config default (15) exceeds the pool; play all
            },
        );

        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        inputs_tx.send(guess("alice", "same")).unwrap();
        inputs_tx.send(guess("bob", "x")).unwrap();
        // Round 1 already closed by attribution; this must not close round 2.
        inputs_tx.send(SessionInput::PlaybackEnded { round: 1 }).unwrap();
        inputs_tx.send(guess("carol", "wrong answer")).unwrap();
        inputs_tx.send(SessionInput::PlaybackEnded { round: 2 }).unwrap();

        let standings = session.run(inputs_rx).await.unwrap();
        assert_eq!(
            standings,
            vec![
                (GuesserId("alice".to_string()), 1),
                (GuesserId("bob".to_string()), 1),
                (GuesserId("carol".to_string()), 0),
            ]
        );

        let events = drain(&mut events_rx);
        let rounds_started = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::RoundStarted { .. }))
            .count();
        assert_eq!(rounds_started, 2);
        let finished: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::RoundFinished { round, .. } => Some(*round),
                _ => None,
            })
            .collect();
        assert_eq!(finished, vec![1, 2]);
    }

    #[tokio::test]
    async fn incorrect_guesses_are_acknowledged() {
        let (session, mut events_rx) = session(
            vec![track("t1", "Test", "A")],
            SessionOptions {
                playlist: Some("p".to_string()),
                length: Some(1),
            },
        );

        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        inputs_tx.send(guess("erin", "way off")).unwrap();
        inputs_tx.send(SessionInput::PlaybackEnded { round: 1 }).unwrap();

        let standings = session.run(inputs_rx).await.unwrap();
        assert_eq!(standings, vec![(GuesserId("erin".to_string()), 0)]);

        let events = drain(&mut events_rx);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::IncorrectGuess { .. })));
    }

    #[tokio::test]
    async fn empty_playlist_fails_visibly() {
        let (session, _events_rx) = session(
            vec![],
            SessionOptions {
                playlist: Some("p".to_string()),
                length: Some(5),
            },
        );
        let (_inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        assert!(matches!(
            session.run(inputs_rx).await,
            Err(GameError::NoPlayableTracks)
        ));
    }

    #[tokio::test]
    async fn dropped_input_stream_aborts_the_game() {
        let (session, _events_rx) = session(
            vec![track("t1", "Test", "A")],
            SessionOptions {
                playlist: Some("p".to_string()),
                length: Some(1),
            },
        );
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();
        drop(inputs_tx);
        assert!(matches!(
            session.run(inputs_rx).await,
            Err(GameError::InputStreamClosed)
        ));
    }

    #[test]
    fn selection_is_without_replacement_and_count_bounded() {
        let pool: Vec<Track> = (0..10)
            .map(|i| track(&format!("t{i}"), &format!("Title {i}"), "Artist"))
            .collect();

        let mut rng = StdRng::seed_from_u64(7);
        let selected = select_tracks(pool.clone(), 4, &mut rng);
        assert_eq!(selected.len(), 4);
        let mut ids: Vec<_> = selected.iter().map(|t| t.id.clone()).collect();
        ids.sort_by(|a, b| a.0.cmp(&b.0));
        ids.dedup();
        assert_eq!(ids.len(), 4);
        assert!(selected.iter().all(|t| pool.contains(t)));

        // Requesting more than the pool holds plays the whole pool.
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(select_tracks(pool.clone(), 99, &mut rng).len(), 10);
    }
}

//! Strategy backed by an external reasoning service.
//!
//! The service receives the running transcript and answers in free text
//! containing `Action: <value>`. Replies that cannot be used are retried a
//! bounded number of times; after that the strategy plays a uniformly
//! random move instead of failing the episode.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::environment::Observation;
use crate::error::{ArenaError, Result};
use crate::random::SeededRng;
use crate::strategy::Strategy;
use crate::Action;

const ACTION_MARKER: &str = "Action:";

/// Author of a transcript message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Standing instructions
    System,
    /// Game updates sent to the service
    Human,
    /// Replies of the service
    Assistant,
}

/// A message in the transcript.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self { role: Role::Human, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// The external service. Calls block until the reply is available.
pub trait ReasoningClient: Send + Sync {
    fn complete(&self, transcript: &[Message]) -> Result<String>;
}

/// How often to ask again after an unusable reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total number of requests per move, including the first.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub backoff: Duration,
}

impl RetryPolicy {
    /// `max_attempts` requests with no wait in between
    pub fn immediate(max_attempts: u32) -> Self {
        Self { max_attempts, backoff: Duration::ZERO }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 2, backoff: Duration::from_secs(1) }
    }
}

/// Extract the action from the first `Action: <value>` line of `reply`.
///
/// The value must be `0` (Cooperate) or `1` (Defect).
pub fn parse_action(reply: &str) -> Result<Action> {
    let start = reply.find(ACTION_MARKER).ok_or_else(|| ArenaError::Collaborator {
        message: format!("no `{}` in reply", ACTION_MARKER),
    })?;
    let value = reply[start + ACTION_MARKER.len()..]
        .lines()
        .next()
        .unwrap_or_default()
        .trim();

    let action = value
        .parse::<i64>()
        .map_err(|_| ArenaError::Collaborator {
            message: format!("unparseable action {:?}", value),
        })
        .and_then(|number| Action::try_from(number))?;

    if !action.is_played() {
        return Err(ArenaError::Collaborator {
            message: format!("illegal action {:?}", value),
        });
    }
    Ok(action)
}

/// Renders an observation for the transcript.
pub type ObservationFormatter = Arc<dyn Fn(&Observation) -> String + Send + Sync>;

/// Rows as `C`/`D` letters separated by ` | `, unplayed rounds omitted.
fn format_rows(observation: &Observation) -> String {
    observation
        .rows()
        .iter()
        .map(|row| row.iter().filter(|a| a.is_played()).map(|a| a.letter()).collect::<String>())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Strategy that asks a `ReasoningClient` for every move
#[derive(Clone)]
pub struct ReasoningStrategy {
    name: String,
    client: Arc<dyn ReasoningClient>,
    instructions: String,
    formatter: ObservationFormatter,
    retry: RetryPolicy,
    transcript: Vec<Message>,
    total_return: i64,
}

impl ReasoningStrategy {
    pub fn new(client: Arc<dyn ReasoningClient>, instructions: impl Into<String>) -> Self {
        let instructions = instructions.into();
        Self {
            name: "Reasoning".to_string(),
            client,
            transcript: vec![Message::system(instructions.clone())],
            instructions,
            formatter: Arc::new(format_rows),
            retry: RetryPolicy::default(),
            total_return: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_formatter(mut self, formatter: ObservationFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    /// Sum of rewards received this episode
    pub fn total_return(&self) -> i64 {
        self.total_return
    }

    /// One request; the reply is kept in the transcript even if unusable.
    fn ask(&mut self) -> Result<Action> {
        let reply = self.client.complete(&self.transcript)?;
        let action = parse_action(&reply);
        self.transcript.push(Message::assistant(reply));
        action
    }
}

impl fmt::Debug for ReasoningStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReasoningStrategy")
            .field("name", &self.name)
            .field("retry", &self.retry)
            .field("transcript", &self.transcript.len())
            .field("total_return", &self.total_return)
            .finish_non_exhaustive()
    }
}

impl Strategy for ReasoningStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn play(
        &mut self,
        observation: &Observation,
        reward: Option<i32>,
        rng: &mut SeededRng,
    ) -> Result<Action> {
        if let Some(reward) = reward {
            self.total_return += reward as i64;
        }

        let reward_text = reward.map_or_else(|| "None".to_string(), |r| r.to_string());
        self.transcript.push(Message::human(format!(
            "Observation: {}\nReward: {}\nReturn: {}",
            (self.formatter)(observation),
            reward_text,
            self.total_return
        )));

        for attempt in 1..=self.retry.max_attempts {
            match self.ask() {
                Ok(action) => return Ok(action),
                Err(err) => {
                    log::warn!(
                        "{}: attempt {}/{} failed: {}",
                        self.name,
                        attempt,
                        self.retry.max_attempts,
                        err
                    );
                    if attempt < self.retry.max_attempts && !self.retry.backoff.is_zero() {
                        std::thread::sleep(self.retry.backoff);
                    }
                }
            }
        }

        let action = Action::random(rng);
        log::warn!("{}: retries exhausted, playing random {:?}", self.name, action);
        Ok(action)
    }

    fn reset(&mut self) {
        self.transcript = vec![Message::system(self.instructions.clone())];
        self.total_return = 0;
    }

    fn clone_box(&self) -> Box<dyn Strategy> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies with a fixed script, then errors
    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String>>>,
        calls: Mutex<Vec<usize>>,
    }

    impl ScriptedClient {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn transcript_lengths(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ReasoningClient for ScriptedClient {
        fn complete(&self, transcript: &[Message]) -> Result<String> {
            self.calls.lock().unwrap().push(transcript.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ArenaError::Collaborator { message: "script exhausted".into() }))
        }
    }

    fn ok(text: &str) -> Result<String> {
        Ok(text.to_string())
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(parse_action("Thinking...\nAction: 1"), Ok(Action::Defect));
        assert_eq!(parse_action("Action:  0 \nbecause"), Ok(Action::Cooperate));
        assert!(parse_action("I cooperate").is_err());
        assert!(parse_action("Action: cooperate").is_err());
        assert!(parse_action("Action: -1").is_err());
        assert!(parse_action("Action: 2").is_err());
    }

    #[test]
    fn test_plays_parsed_action() {
        let client = ScriptedClient::new(vec![ok("Action: 1")]);
        let mut strategy = ReasoningStrategy::new(client.clone(), "play well")
            .with_retry(RetryPolicy::immediate(2));
        let mut rng = SeededRng::from_seed(1);

        let action = strategy.play(&Observation::empty(2), None, &mut rng).unwrap();
        assert_eq!(action, Action::Defect);
        assert_eq!(client.transcript_lengths(), vec![2]);

        let roles: Vec<Role> = strategy.transcript().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Human, Role::Assistant]);
        assert!(strategy.transcript()[1].content.contains("Reward: None"));
    }

    #[test]
    fn test_retries_after_unparseable_reply() {
        let client = ScriptedClient::new(vec![ok("hmm"), ok("Action: 0")]);
        let mut strategy = ReasoningStrategy::new(client.clone(), "rules")
            .with_retry(RetryPolicy::immediate(2));
        let mut rng = SeededRng::from_seed(1);

        assert_eq!(strategy.play(&Observation::empty(2), None, &mut rng), Ok(Action::Cooperate));
        // The failed reply stays in the transcript for the second attempt
        assert_eq!(client.transcript_lengths(), vec![2, 3]);
    }

    #[test]
    fn test_falls_back_to_random_after_exhaustion() {
        let client = ScriptedClient::new(vec![
            ok("no idea"),
            Err(ArenaError::Collaborator { message: "timeout".into() }),
        ]);
        let mut strategy = ReasoningStrategy::new(client.clone(), "rules")
            .with_retry(RetryPolicy::immediate(2));
        let mut rng = SeededRng::from_seed(1);

        let action = strategy.play(&Observation::empty(2), None, &mut rng).unwrap();
        assert!(action.is_played());
        assert_eq!(client.transcript_lengths().len(), 2);
    }

    #[test]
    fn test_fallback_is_uniform() {
        let client = ScriptedClient::new(Vec::new());
        let mut strategy = ReasoningStrategy::new(client, "rules")
            .with_retry(RetryPolicy::immediate(1));
        let mut rng = SeededRng::from_seed(4);

        let defects = (0..400)
            .filter(|_| strategy.play(&Observation::empty(1), None, &mut rng).unwrap() == Action::Defect)
            .count();
        assert!(defects > 150 && defects < 250, "defects = {}", defects);
    }

    #[test]
    fn test_return_accumulates_and_reset_clears() {
        let client = ScriptedClient::new(vec![ok("Action: 0"), ok("Action: 0"), ok("Action: 1")]);
        let mut strategy = ReasoningStrategy::new(client, "rules")
            .with_retry(RetryPolicy::immediate(1));
        let mut rng = SeededRng::from_seed(1);
        let obs = Observation::empty(3);

        strategy.play(&obs, None, &mut rng).unwrap();
        strategy.play(&obs, Some(6), &mut rng).unwrap();
        strategy.play(&obs, Some(3), &mut rng).unwrap();
        assert_eq!(strategy.total_return(), 9);
        assert!(strategy.transcript().last().unwrap().content.contains("Action: 1"));
        assert!(strategy.transcript()[5].content.contains("Return: 9"));

        strategy.reset();
        assert_eq!(strategy.total_return(), 0);
        assert_eq!(strategy.transcript(), &[Message::system("rules")]);
    }

    #[test]
    fn test_custom_formatter() {
        let client = ScriptedClient::new(vec![ok("Action: 0")]);
        let mut strategy = ReasoningStrategy::new(client, "rules")
            .with_formatter(Arc::new(|obs: &Observation| format!("{} rounds", obs.rounds_known())))
            .with_retry(RetryPolicy::immediate(1));
        let mut rng = SeededRng::from_seed(1);

        strategy.play(&Observation::empty(3), None, &mut rng).unwrap();
        assert!(strategy.transcript()[1].content.starts_with("Observation: 0 rounds"));
    }

    #[test]
    fn test_default_retry_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.backoff, Duration::from_secs(1));
    }
}

//! Agent implementation - orchestrates the model <-> action loop

use crate::config::AgentConfig;
use crate::handlers::HandlerRegistry;
use crate::retry::RetryPolicy;
use taskrun_core::prompt::PolicyGate;
use taskrun_core::provider::{ChatMessage, CompletionRequest, LlmProvider, UsageTracker};
use taskrun_core::{parse_action, system_prompt, Action};
use taskrun_error::{Error, ErrorKind, Result};

/// How a task ended
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// The model emitted `done`; carries the final answer
    Done(String),
    /// The iteration cap was reached without `done`; carries a summary
    IterationLimit(String),
}

impl TaskOutcome {
    /// The user-facing text of this outcome
    pub fn text(&self) -> &str {
        match self {
            TaskOutcome::Done(text) | TaskOutcome::IterationLimit(text) => text,
        }
    }
}

/// The agent orchestrator - drives the iterate-call-parse-dispatch loop
pub struct Agent<P: LlmProvider> {
    provider: P,
    config: AgentConfig,
    gate: PolicyGate,
    handlers: HandlerRegistry,
    transcript: Vec<ChatMessage>,
    usage: UsageTracker,
}

impl<P: LlmProvider> Agent<P> {
    /// Create an agent with the built-in handler set
    pub fn new(config: AgentConfig, provider: P, gate: PolicyGate) -> Self {
        Self::with_handlers(config, provider, gate, HandlerRegistry::builtin())
    }

    /// Create an agent with a custom handler registry
    pub fn with_handlers(
        config: AgentConfig,
        provider: P,
        gate: PolicyGate,
        handlers: HandlerRegistry,
    ) -> Self {
        Self {
            provider,
            config,
            gate,
            handlers,
            transcript: Vec::new(),
            usage: UsageTracker::new(),
        }
    }

    /// Token usage accumulated across provider calls
    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    /// The policy gate (the embedding program saves its store at shutdown)
    pub fn gate(&self) -> &PolicyGate {
        &self.gate
    }

    /// Take the policy gate back out of the agent
    pub fn into_gate(self) -> PolicyGate {
        self.gate
    }

    /// The current transcript
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    /// Run one task to completion.
    ///
    /// Ends with `Done` when the model finishes, `IterationLimit` when the
    /// cap is hit, or an error on broken infrastructure (provider failures
    /// past the retry budget, unreadable approval prompt). Ordinary command
    /// failures never abort - they go back to the model as observations.
    pub async fn run(&mut self, task: &str) -> Result<TaskOutcome> {
        self.transcript = vec![ChatMessage::system(system_prompt()), ChatMessage::user(task)];

        let retry = RetryPolicy::new(self.config.max_retries, self.config.retry_base_delay);

        if self.config.verbose {
            println!("Task: {}\n", task);
        }

        for iteration in 1..=self.config.max_iterations {
            compact(&mut self.transcript, self.config.transcript_max, self.config.transcript_tail);

            let messages = self.transcript.clone();
            let provider = &self.provider;
            let response = retry
                .call(|| {
                    let messages = messages.clone();
                    async move {
                        provider
                            .complete(CompletionRequest::new(messages))
                            .await
                            .map_err(Error::from)
                    }
                })
                .await?;

            self.usage.track(&response.model, &response.usage);
            let raw = response.content.unwrap_or_default();
            self.transcript.push(ChatMessage::assistant(raw.clone()));

            let action = match parse_action(&raw) {
                Ok(action) => action,
                Err(e) => {
                    tracing::debug!(iteration, error = %e, "model reply did not parse");
                    if self.config.verbose {
                        println!("  [{}/{}] reply did not parse, correcting", iteration, self.config.max_iterations);
                    }
                    self.transcript.push(ChatMessage::user(corrective_parse_message(&e, &raw)));
                    continue;
                }
            };

            if self.config.verbose {
                println!("  [{}/{}] {}", iteration, self.config.max_iterations, action);
            }

            if let Action::Done { result } = &action {
                let result = if result.is_empty() {
                    "Task completed.".to_string()
                } else {
                    result.clone()
                };
                return Ok(TaskOutcome::Done(result));
            }

            let Some(handler) = self.handlers.get(action.type_name()) else {
                self.transcript.push(ChatMessage::user(format!(
                    "unknown action type '{}'. Known types: {}, done.",
                    action.type_name(),
                    self.handlers.names().join(", ")
                )));
                continue;
            };

            let observation = match handler.execute(&action, &mut self.gate).await {
                Ok(observation) => observation,
                // Infrastructure failure (e.g. unreadable approval prompt)
                Err(e) if e.kind() == ErrorKind::PromptFailed => return Err(e),
                // Anything else a handler reports is still just an observation
                Err(e) => format!("error: {}", e),
            };

            if self.config.verbose {
                println!("      observation: {} chars", observation.len());
            }

            self.transcript.push(ChatMessage::user(format!(
                "observation:{}\n{}",
                action.type_name(),
                observation
            )));
        }

        let summary = format!(
            "Stopped after {} iterations without a final answer.",
            self.config.max_iterations
        );
        if self.config.verbose {
            println!("\n{}", summary);
        }
        Ok(TaskOutcome::IterationLimit(summary))
    }
}

/// Sliding-window transcript compaction.
///
/// When the transcript exceeds `max` messages it is cut to the first two
/// (system prompt and task - never evicted) plus the last `tail`.
pub fn compact(transcript: &mut Vec<ChatMessage>, max: usize, tail: usize) {
    if transcript.len() <= max {
        return;
    }
    let kept_tail = transcript[transcript.len() - tail..].to_vec();
    transcript.truncate(2);
    transcript.extend(kept_tail);
}

fn corrective_parse_message(error: &Error, raw: &str) -> String {
    format!(
        "Your reply could not be parsed into an action: {}.\n\
         Reply with exactly one JSON object with a \"type\" field and no \
         surrounding prose. Offending reply (truncated):\n{}",
        error.message(),
        truncate(raw, 400)
    )
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let cut = s
            .char_indices()
            .take_while(|(i, _)| *i < max.saturating_sub(1))
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}…", &s[..cut])
    }
}

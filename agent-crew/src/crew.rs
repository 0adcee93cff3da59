use std::collections::{HashMap, HashSet};

use agent_adapters::traits::{AdapterResult, InferenceRequest, TokenUsage, collect_response};
use serde::Serialize;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::error::{CrewError, CrewResult};
use crate::interpolate::interpolate;
use crate::task::{Task, TaskOutput};

const CONTEXT_SEPARATOR: &str = "\n\n----------\n\n";

/// A set of agents executing tasks one after another.
#[derive(Clone, Debug)]
pub struct Crew {
    agents: Vec<Agent>,
    tasks: Vec<Task>,
}

/// Aggregate result of [`Crew::kickoff`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CrewOutput {
    /// Output of the last task.
    pub raw: String,
    /// Every task's output, in execution order.
    pub tasks_output: Vec<TaskOutput>,
    /// Usage summed over every task that reported it.
    pub token_usage: Option<TokenUsage>,
}

impl Crew {
    /// Starts assembling a crew.
    #[must_use]
    pub fn builder() -> CrewBuilder {
        CrewBuilder::default()
    }

    /// Returns the crew's agents.
    #[must_use]
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Returns the crew's tasks.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Model identifier of the first agent, used to label telemetry.
    #[must_use]
    pub fn model(&self) -> &str {
        self.agents
            .first()
            .map_or("", |agent| agent.adapter().metadata().model())
    }

    /// Runs every task in order with `inputs` interpolated into its texts.
    ///
    /// # Errors
    ///
    /// Returns [`CrewError::MissingInput`] when a placeholder has no value and
    /// [`CrewError::TaskFailed`] when a model call fails; later tasks do not run.
    pub async fn kickoff(&self, inputs: &HashMap<String, String>) -> CrewResult<CrewOutput> {
        let mut tasks_output: Vec<TaskOutput> = Vec::with_capacity(self.tasks.len());
        let mut token_usage: Option<TokenUsage> = None;

        for task in &self.tasks {
            let agent = self.agent_for(task)?;
            let description = interpolate(task.description(), inputs)?;
            let expected_output = interpolate(task.expected_output(), inputs)?;

            info!(agent = agent.role(), task = %description, "crew task started");

            let context = tasks_output
                .iter()
                .map(|output| output.raw.as_str())
                .collect::<Vec<_>>()
                .join(CONTEXT_SEPARATOR);
            let prompt = task_prompt(&description, &expected_output, &context);
            let request = build_request(agent, prompt).map_err(|source| CrewError::TaskFailed {
                task: description.clone(),
                source,
            })?;

            let response = async {
                let stream = agent.adapter().infer(request).await?;
                collect_response(stream).await
            }
            .await
            .map_err(|source| CrewError::TaskFailed {
                task: description.clone(),
                source,
            })?;

            if let Some(usage) = response.usage {
                token_usage = Some(token_usage.unwrap_or_default() + usage);
            }
            debug!(
                agent = agent.role(),
                chars = response.text.len(),
                "crew task finished"
            );

            tasks_output.push(TaskOutput {
                description,
                agent: agent.role().to_owned(),
                raw: response.text,
                usage: response.usage,
            });
        }

        let raw = tasks_output
            .last()
            .map(|output| output.raw.clone())
            .unwrap_or_default();

        Ok(CrewOutput {
            raw,
            tasks_output,
            token_usage,
        })
    }

    fn agent_for(&self, task: &Task) -> CrewResult<&Agent> {
        match task.agent() {
            Some(role) => self
                .agents
                .iter()
                .find(|agent| agent.role() == role)
                .ok_or_else(|| CrewError::UnknownAgent {
                    role: role.to_owned(),
                }),
            None => self.agents.first().ok_or_else(|| CrewError::InvalidCrew {
                reason: "crew has no agents".to_owned(),
            }),
        }
    }
}

fn task_prompt(description: &str, expected_output: &str, context: &str) -> String {
    let mut prompt = format!(
        "{description}\n\nThis is the expected criteria for your final answer: {expected_output}"
    );
    if !context.is_empty() {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(context);
    }
    prompt
}

fn build_request(agent: &Agent, prompt: String) -> AdapterResult<InferenceRequest> {
    let mut request = InferenceRequest::from_prompt(prompt)?.with_system_prompt(agent.persona());
    if let Some(temperature) = agent.temperature() {
        request = request.with_temperature(temperature);
    }
    if let Some(tokens) = agent.max_output_tokens() {
        request = request.with_max_output_tokens(tokens);
    }
    Ok(request)
}

/// Builder for [`Crew`].
#[derive(Default)]
pub struct CrewBuilder {
    agents: Vec<Agent>,
    tasks: Vec<Task>,
}

impl CrewBuilder {
    /// Adds an agent.
    #[must_use]
    pub fn agent(mut self, agent: Agent) -> Self {
        self.agents.push(agent);
        self
    }

    /// Appends a task; tasks run in insertion order.
    #[must_use]
    pub fn task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Validates and builds the crew.
    ///
    /// # Errors
    ///
    /// Returns [`CrewError::InvalidCrew`] when there are no agents, no tasks or
    /// duplicate roles, and [`CrewError::UnknownAgent`] when a task names a
    /// role no agent plays.
    pub fn build(self) -> CrewResult<Crew> {
        if self.agents.is_empty() {
            return Err(CrewError::InvalidCrew {
                reason: "crew requires at least one agent".to_owned(),
            });
        }
        if self.tasks.is_empty() {
            return Err(CrewError::InvalidCrew {
                reason: "crew requires at least one task".to_owned(),
            });
        }

        let mut roles = HashSet::new();
        for agent in &self.agents {
            if !roles.insert(agent.role()) {
                return Err(CrewError::InvalidCrew {
                    reason: format!("duplicate agent role `{}`", agent.role()),
                });
            }
        }

        if let Some(role) = self
            .tasks
            .iter()
            .filter_map(Task::agent)
            .find(|role| !roles.contains(role))
        {
            return Err(CrewError::UnknownAgent {
                role: role.to_owned(),
            });
        }

        Ok(Crew {
            agents: self.agents,
            tasks: self.tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use agent_adapters::traits::{
        AdapterError, AdapterMetadata, AdapterStream, InferenceChunk, ModelAdapter,
    };
    use async_trait::async_trait;
    use futures::stream;

    use super::*;

    struct ScriptedAdapter {
        metadata: AdapterMetadata,
        replies: Mutex<Vec<AdapterResult<(String, Option<TokenUsage>)>>>,
        seen: Mutex<Vec<InferenceRequest>>,
    }

    impl ScriptedAdapter {
        fn new(replies: Vec<AdapterResult<(String, Option<TokenUsage>)>>) -> Arc<Self> {
            Arc::new(Self {
                metadata: AdapterMetadata::new("scripted", "scripted-1"),
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelAdapter for ScriptedAdapter {
        fn metadata(&self) -> &AdapterMetadata {
            &self.metadata
        }

        async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
            self.seen.lock().unwrap().push(request);
            let (text, usage) = self.replies.lock().unwrap().remove(0)?;
            let chunk = InferenceChunk::new(text, true).with_usage(usage);
            Ok(Box::pin(stream::once(async move { Ok(chunk) })))
        }
    }

    fn researcher(adapter: Arc<ScriptedAdapter>) -> Agent {
        Agent::builder("Researcher")
            .goal("Explain concepts concisely")
            .backstory("Senior engineer who teaches clearly.")
            .adapter(adapter)
            .build()
            .unwrap()
    }

    fn topic(value: &str) -> HashMap<String, String> {
        HashMap::from([("topic".to_owned(), value.to_owned())])
    }

    #[test]
    fn build_rejects_empty_crews() {
        let err = Crew::builder().build().expect_err("no agents");
        assert!(matches!(err, CrewError::InvalidCrew { .. }));

        let adapter = ScriptedAdapter::new(Vec::new());
        let err = Crew::builder()
            .agent(researcher(adapter))
            .build()
            .expect_err("no tasks");
        assert!(matches!(err, CrewError::InvalidCrew { .. }));
    }

    #[test]
    fn build_rejects_unknown_roles() {
        let adapter = ScriptedAdapter::new(Vec::new());
        let err = Crew::builder()
            .agent(researcher(adapter))
            .task(Task::new("do it", "done").assigned_to("Writer"))
            .build()
            .expect_err("unknown role");
        assert!(matches!(err, CrewError::UnknownAgent { ref role } if role == "Writer"));
    }

    #[test]
    fn agent_requires_adapter_and_goal() {
        let err = Agent::builder("Researcher")
            .backstory("b")
            .build()
            .expect_err("no goal");
        assert!(matches!(err, CrewError::InvalidAgent { .. }));

        let err = Agent::builder("Researcher")
            .goal("g")
            .backstory("b")
            .build()
            .expect_err("no adapter");
        assert!(matches!(err, CrewError::InvalidAgent { .. }));
    }

    #[tokio::test]
    async fn kickoff_interpolates_and_uses_persona() {
        let adapter = ScriptedAdapter::new(vec![Ok((
            "- traces\n- metrics".to_owned(),
            Some(TokenUsage::new(40, 12)),
        ))]);
        let crew = Crew::builder()
            .agent(researcher(Arc::clone(&adapter)))
            .task(Task::new(
                "Answer the user question: {topic}",
                "A short, precise answer with 2-3 bullet points.",
            ))
            .build()
            .unwrap();

        let output = crew.kickoff(&topic("why observe agents?")).await.unwrap();

        assert_eq!(output.raw, "- traces\n- metrics");
        assert_eq!(output.token_usage, Some(TokenUsage::new(40, 12)));
        assert_eq!(output.tasks_output.len(), 1);
        assert_eq!(output.tasks_output[0].agent, "Researcher");
        assert_eq!(
            output.tasks_output[0].description,
            "Answer the user question: why observe agents?"
        );

        let seen = adapter.seen.lock().unwrap();
        let request = &seen[0];
        let system = request.system_prompt().unwrap();
        assert!(system.starts_with("You are Researcher."));
        assert!(system.contains("Your personal goal is: Explain concepts concisely"));
        let prompt = request.messages()[0].content();
        assert!(prompt.contains("why observe agents?"));
        assert!(prompt.contains("expected criteria for your final answer"));
        assert!(!prompt.contains("context you're working with"));
    }

    #[tokio::test]
    async fn later_tasks_receive_earlier_output_as_context() {
        let adapter = ScriptedAdapter::new(vec![
            Ok(("draft notes".to_owned(), Some(TokenUsage::new(5, 5)))),
            Ok(("final answer".to_owned(), None)),
        ]);
        let crew = Crew::builder()
            .agent(researcher(Arc::clone(&adapter)))
            .task(Task::new("Research {topic}", "notes"))
            .task(Task::new("Summarise the notes", "summary").assigned_to("Researcher"))
            .build()
            .unwrap();

        let output = crew.kickoff(&topic("spans")).await.unwrap();

        assert_eq!(output.raw, "final answer");
        assert_eq!(output.token_usage, Some(TokenUsage::new(5, 5)));
        let seen = adapter.seen.lock().unwrap();
        assert!(seen[1].messages()[0].content().contains("draft notes"));
    }

    #[tokio::test]
    async fn adapter_failure_stops_the_crew() {
        let adapter = ScriptedAdapter::new(vec![
            Err(AdapterError::transport("connection refused")),
            Ok(("unused".to_owned(), None)),
        ]);
        let crew = Crew::builder()
            .agent(researcher(Arc::clone(&adapter)))
            .task(Task::new("first", "x"))
            .task(Task::new("second", "y"))
            .build()
            .unwrap();

        let err = crew.kickoff(&HashMap::new()).await.expect_err("failure");
        assert!(matches!(err, CrewError::TaskFailed { ref task, .. } if task == "first"));
        assert_eq!(err.kind(), "TransportError");
        assert_eq!(adapter.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_input_fails_before_any_call() {
        let adapter = ScriptedAdapter::new(Vec::new());
        let crew = Crew::builder()
            .agent(researcher(Arc::clone(&adapter)))
            .task(Task::new("Answer {topic}", "answer"))
            .build()
            .unwrap();

        let err = crew.kickoff(&HashMap::new()).await.expect_err("missing");
        assert_eq!(err.kind(), "MissingInputError");
        assert!(adapter.seen.lock().unwrap().is_empty());
    }
}

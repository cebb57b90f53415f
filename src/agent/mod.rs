use std::collections::HashMap;

use serde_json::{json, Value};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    action::{execute_tool, parse_action, parse_literal},
    error::AgentError,
    llm::{CompletionClient, EmbeddingClient},
    memory::MemoryStore,
    perception::extract_perception,
    planner::generate_plan,
    tools::Tool,
    types::{AgentConfig, MemoryFilter, MemoryItem, MemoryKind, PlanAction, ToolCallResult},
};

/// The agent: a bounded perceive / retrieve / plan / act loop over a tool
/// catalog, a per-run memory store, and two provider clients.
pub struct Agent<E, L>
where
    E: EmbeddingClient,
    L: CompletionClient,
{
    embedder: E,
    llm: L,
    tools: HashMap<String, Box<dyn Tool>>,
    config: AgentConfig,
}

/// What one loop step decided. The loop's dispatch is an explicit switch
/// over this, never exception-driven control flow.
enum StepOutcome {
    /// Keep looping with a new working input.
    Continue { next_input: String },
    /// A final answer was planned; these are its parsed records.
    Done(Vec<Value>),
    /// A planner- or tool-level failure; the run ends with whatever results
    /// have accumulated.
    Failed(AgentError),
}

impl<E, L> Agent<E, L>
where
    E: EmbeddingClient,
    L: CompletionClient,
{
    pub fn new(embedder: E, llm: L) -> Self {
        Self {
            embedder,
            llm,
            tools: HashMap::new(),
            config: AgentConfig::default(),
        }
    }

    pub fn with_config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn register_tool<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name(), Box::new(tool));
    }

    /// Catalog rendered for the planner prompt, one `- name: purpose` line
    /// per tool. Sorted, since map order is not.
    fn tool_descriptions(&self) -> String {
        let mut lines: Vec<String> = self
            .tools
            .values()
            .map(|tool| {
                format!(
                    "- {}: {}",
                    tool.name(),
                    tool.description()
                        .unwrap_or_else(|| "No description".to_string())
                )
            })
            .collect();
        lines.sort();
        lines.join("\n")
    }

    /// Answer one query. Each iteration, bounded by `max_steps`:
    ///
    /// 1. Perceive the working input into an intent record.
    /// 2. Retrieve relevant session memories.
    /// 3. Plan exactly one action.
    /// 4. A final answer ends the run with its parsed records; a tool call
    ///    is executed, remembered, folded into the running results, and the
    ///    next working input is built from its output.
    ///
    /// Planner and tool failures end the run with the accumulated (possibly
    /// empty) results rather than raising. Only infrastructure failures
    /// (the embedding path) propagate.
    pub async fn run(&self, query: &str, top_k: usize) -> Result<Vec<Value>, AgentError> {
        info!("agent starting");

        let mut memory = MemoryStore::new(&self.embedder);
        let session_id = format!("session-{}", Uuid::new_v4().simple());
        let tool_descriptions = self.tool_descriptions();

        let mut results: Vec<Value> = Vec::new();
        let mut working_input = query.to_string();
        let mut step = 0;

        while step < self.config.max_steps {
            info!("step {} started", step + 1);

            let outcome = self
                .step(
                    query,
                    &working_input,
                    &session_id,
                    &tool_descriptions,
                    top_k,
                    &mut memory,
                    &mut results,
                )
                .await?;

            match outcome {
                StepOutcome::Continue { next_input } => working_input = next_input,
                StepOutcome::Done(parsed) => {
                    results = parsed;
                    break;
                }
                StepOutcome::Failed(err) => {
                    error!("step failed, ending run: {err}");
                    break;
                }
            }

            step += 1;
        }

        info!("agent session completed");
        Ok(results)
    }

    #[allow(clippy::too_many_arguments)]
    async fn step(
        &self,
        original_query: &str,
        working_input: &str,
        session_id: &str,
        tool_descriptions: &str,
        top_k: usize,
        memory: &mut MemoryStore<'_>,
        results: &mut Vec<Value>,
    ) -> Result<StepOutcome, AgentError> {
        let perception = extract_perception(&self.llm, working_input).await;
        info!(
            "perception - intent: {}, tool hint: {:?}",
            perception.intent, perception.tool_hint
        );

        let filter = MemoryFilter {
            session_id: Some(session_id.to_string()),
            ..MemoryFilter::default()
        };
        let retrieved = memory
            .retrieve(working_input, self.config.memory_top_k, &filter)
            .await?;
        info!("memory - retrieved {} relevant memories", retrieved.len());

        let plan = generate_plan(
            &self.llm,
            &perception,
            &retrieved,
            tool_descriptions,
            self.config.max_steps,
        )
        .await;
        info!("plan generated: {plan}");

        let action = match parse_action(&plan) {
            Ok(action) => action,
            Err(err) => return Ok(StepOutcome::Failed(err)),
        };

        match action {
            PlanAction::FinalAnswer(payload) => {
                info!("final result: {payload}");
                Ok(StepOutcome::Done(parse_final_answer(&payload)))
            }
            PlanAction::ToolCall { name, arguments } => {
                let call = match execute_tool(&self.tools, &name, arguments).await {
                    Ok(call) => call,
                    Err(err) => return Ok(StepOutcome::Failed(err)),
                };
                info!("tool - {} returned: {}", call.tool_name, call.result);

                memory
                    .add(
                        MemoryItem::new(
                            format!(
                                "Tool call: {} with {}, got: {}",
                                call.tool_name,
                                Value::Object(call.arguments.clone()),
                                call.result
                            ),
                            MemoryKind::ToolOutput,
                        )
                        .with_tool_name(&call.tool_name)
                        .with_user_query(original_query)
                        .with_tags(vec![call.tool_name.clone()])
                        .with_session_id(session_id),
                    )
                    .await?;

                self.fold_results(&call, top_k, results);

                let next_input = format!(
                    "Original task: {original_query}\nPrevious output: {}\nWhat should I do next?",
                    call.result
                );
                Ok(StepOutcome::Continue { next_input })
            }
        }
    }

    /// Fold a tool result into the running result set. Lists append up to
    /// `top_k` elements; the designated search tool replaces the set with
    /// its top-`top_k` items instead.
    fn fold_results(&self, call: &ToolCallResult, top_k: usize, results: &mut Vec<Value>) {
        let is_search = call.tool_name == self.config.search_tool;
        match &call.result {
            Value::Array(items) => {
                let take: Vec<Value> = items.iter().take(top_k).cloned().collect();
                if is_search {
                    *results = take;
                } else {
                    results.extend(take);
                }
            }
            other => {
                if is_search {
                    *results = vec![other.clone()];
                }
            }
        }
    }
}

/// Parse a FINAL_ANSWER payload into result records. A list literal whose
/// elements are records (or strings parseable into records) becomes the
/// record list; anything else becomes one `{"answer": payload}` record.
fn parse_final_answer(payload: &str) -> Vec<Value> {
    let fallback = || vec![json!({ "answer": payload })];

    if !payload.trim_start().starts_with('[') {
        return fallback();
    }
    let Some(Value::Array(items)) = parse_literal(payload) else {
        return fallback();
    };

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let record = match item {
            Value::Object(map) => Value::Object(map),
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => Value::Object(map),
                _ => return fallback(),
            },
            _ => return fallback(),
        };
        records.push(record);
    }
    records
}

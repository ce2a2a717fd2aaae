//! Terminal chat against the agent, keeping sessions in the local chat history.

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, BufReader};

use ibis_api::{
    agent::{build_graph, token_provider, vertex_client},
    config::Config,
    handlers::stream::stream_messages,
    middleware::logging::init_logging,
    remote::{decode_lines, AgentTarget, ItemStream, RemoteAgentClient},
    schema::{ChatMessage, Feedback, InputChat, RunConfig, StreamRequest},
    telemetry::LocalLogWriter,
};
use ibis_graph::{Graph, LLMConfig};
use ibis_observability::{LogSeverity, LogWriter};
use ibis_persist::{
    title_generator_from_env, ChatSessions, LocalChatHistory, StoredMessage, TitleGenerator, DEFAULT_BASE_DIR,
    EMPTY_CHAT_NAME, SAVED_CHAT_DIR,
};

const HELP: &str = "/new  /delete  /list  /switch <id>  /save  /feedback <score> [text]  /quit";

enum Backend {
    Local { graph: Arc<Graph>, llm: LLMConfig },
    Remote(RemoteAgentClient),
}

impl Backend {
    async fn connect(config: &Config, target: AgentTarget) -> Result<Self> {
        match target {
            AgentTarget::Local => {
                let token = token_provider(config)?;
                let client = vertex_client(config, Arc::clone(&token))?;
                Ok(Self::Local {
                    graph: Arc::new(build_graph(config, client, None)?),
                    llm: LLMConfig::from(&config.llm),
                })
            }
            AgentTarget::RemoteUrl { url, authenticate } => {
                let mut client = RemoteAgentClient::new(url)?;
                if authenticate {
                    client = client.with_token(token_provider(config)?);
                }
                Ok(Self::Remote(client))
            }
        }
    }

    async fn stream(&self, request: StreamRequest) -> Result<ItemStream> {
        match self {
            Self::Local { graph, llm } => {
                let lines = stream_messages(Arc::clone(graph), llm.clone(), request.input, request.config)
                    .map(|line| line.map(String::into_bytes).map_err(anyhow::Error::from));
                Ok(decode_lines(lines))
            }
            Self::Remote(client) => client.stream_messages(&request).await,
        }
    }

    async fn feedback(&self, feedback: Feedback) -> Result<()> {
        match self {
            Self::Local { .. } => LocalLogWriter.write_struct(feedback.into_record(), LogSeverity::Info).await,
            Self::Remote(client) => client.send_feedback(&feedback).await,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::load()?;
    init_logging(&config.logging);

    let user_id = std::env::var("CHAT_USER_ID").unwrap_or_else(|_| "default".to_string());
    let history = LocalChatHistory::new(DEFAULT_BASE_DIR, user_id.clone(), "default")?;
    let mut sessions = ChatSessions::load(history)?;
    let titles = title_generator_from_env();
    let backend = Backend::connect(&config, AgentTarget::from_env()).await?;

    println!("{}", HELP);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(input) = lines.next_line().await? {
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let outcome: Result<()> = match input.split_once(' ').unwrap_or((input, "")) {
            ("/quit", _) => break,
            ("/new", _) => {
                sessions.new_chat();
                Ok(())
            }
            ("/delete", _) => sessions.delete_chat().map_err(Into::into),
            ("/switch", id) => sessions.switch_chat(id.trim()).map_err(Into::into),
            ("/list", _) => {
                print_chats(&sessions);
                Ok(())
            }
            ("/save", _) => sessions.save_current(SAVED_CHAT_DIR).map(|path| {
                if let Some(path) = path {
                    println!("Chat saved to path: {}", path.display());
                }
            }).map_err(Into::into),
            ("/feedback", rest) => send_feedback(&backend, &sessions, rest).await,
            _ => chat_turn(&backend, &mut sessions, titles.as_ref(), &user_id, input).await,
        };

        if let Err(e) = outcome {
            eprintln!("error: {}", e);
        }
    }

    Ok(())
}

async fn chat_turn(
    backend: &Backend,
    sessions: &mut ChatSessions,
    titles: &dyn TitleGenerator,
    user_id: &str,
    input: &str,
) -> Result<()> {
    let session_id = sessions.current_id().to_string();
    let run_id = uuid::Uuid::new_v4().to_string();
    sessions.set_run_id(run_id.clone());

    let Some(session) = sessions.current_mut() else {
        anyhow::bail!("no active chat");
    };
    session.messages.push(StoredMessage::human(input));

    let mut metadata = Map::new();
    metadata.insert("user_id".to_string(), json!(user_id));
    metadata.insert("session_id".to_string(), json!(session_id));
    let request = StreamRequest {
        input: InputChat {
            messages: session.messages.iter().filter_map(to_chat_message).collect(),
        },
        config: Some(RunConfig {
            run_id: Some(run_id),
            metadata: Some(metadata),
            ..Default::default()
        }),
    };

    let mut items = backend.stream(request).await?;
    let mut reply = String::new();
    while let Some(item) = items.next().await {
        let (message, _metadata) = item?;
        match message["type"].as_str() {
            Some("AIMessageChunk") => {
                let chunk = message["content"].as_str().unwrap_or_default();
                print!("{}", chunk);
                let _ = std::io::stdout().flush();
                reply.push_str(chunk);
            }
            Some("tool") => {
                println!("\n[{}] done", message["name"].as_str().unwrap_or("tool"));
            }
            _ => {}
        }
    }
    println!();

    // Blank replies are not persisted
    if !reply.trim().is_empty() {
        session.messages.push(StoredMessage::ai(reply));
    }
    sessions.upsert_current()?;

    let untitled = sessions
        .current()
        .filter(|s| s.title == EMPTY_CHAT_NAME)
        .cloned();
    if let Some(mut titled) = untitled {
        sessions.history().set_title(&mut titled, titles).await?;
        if let Some(session) = sessions.current_mut() {
            *session = titled;
        }
    }
    Ok(())
}

async fn send_feedback(backend: &Backend, sessions: &ChatSessions, rest: &str) -> Result<()> {
    let Some(run_id) = sessions.run_id() else {
        anyhow::bail!("no run to give feedback on");
    };
    let (score, text) = rest.trim().split_once(' ').unwrap_or((rest.trim(), ""));
    let feedback = Feedback {
        score: score.parse()?,
        text: Some(text.to_string()),
        run_id: run_id.to_string(),
        log_type: "feedback".to_string(),
        service_name: ibis_api::schema::SERVICE_NAME.to_string(),
    };
    backend.feedback(feedback).await
}

fn to_chat_message(message: &StoredMessage) -> Option<ChatMessage> {
    serde_json::to_value(message)
        .ok()
        .and_then(|value: Value| serde_json::from_value(value).ok())
}

fn print_chats(sessions: &ChatSessions) {
    println!("Recent");
    for (id, chat) in sessions.recent_chats() {
        println!("  {}  {}", id, chat.title);
    }
    let others = sessions.other_chats();
    if !others.is_empty() {
        println!("Other chats");
        for (id, chat) in others {
            println!("  {}  {}", id, chat.title);
        }
    }
}

use ibis_crew::{CodingTool, CrewConfig, CrewError, DevCrew, DEFAULT_CREW_MODEL};
use ibis_graph::ToolExecutor;
use ibis_llm::mock::{ScriptedChatClient, ScriptedTurn};
use ibis_llm::Content;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn human_text(request: &ibis_llm::ChatRequest) -> String {
    request.messages[1]
        .content()
        .map(Content::text_lossy)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_kickoff_runs_tasks_in_order_with_context() {
    let client = Arc::new(ScriptedChatClient::new(vec![
        ScriptedTurn::text("print('draft')"),
        ScriptedTurn::text("print('reviewed')"),
    ]));
    let crew = DevCrew::new(client.clone(), CrewConfig::builtin().unwrap());

    let inputs = HashMap::from([("code_instructions".to_string(), "print a word".to_string())]);
    let output = crew.kickoff(&inputs).await.unwrap();

    assert_eq!(output.final_output, "print('reviewed')");
    let tasks: Vec<&str> = output.task_outputs.iter().map(|o| o.task.as_str()).collect();
    assert_eq!(tasks, vec!["code_task", "evaluate_task"]);

    let requests = client.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].model, DEFAULT_CREW_MODEL);

    let first = human_text(&requests[0]);
    assert!(first.contains("print a word"));
    assert!(!first.contains("{code_instructions}"));

    // QA task sees the engineer's draft
    assert!(human_text(&requests[1]).contains("print('draft')"));
    let system = requests[1].messages[0].content().map(Content::text_lossy).unwrap();
    assert!(system.starts_with("You are Chief Software Quality Control Engineer."));
}

#[tokio::test]
async fn test_missing_input_makes_no_model_calls() {
    let client = Arc::new(ScriptedChatClient::new(vec![ScriptedTurn::text("unused")]));
    let crew = DevCrew::new(client.clone(), CrewConfig::builtin().unwrap());

    let err = crew.kickoff(&HashMap::new()).await.unwrap_err();

    assert!(matches!(err, CrewError::MissingInput(key) if key == "code_instructions"));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_model_failure_stops_pipeline() {
    let client = Arc::new(ScriptedChatClient::new(vec![
        ScriptedTurn::Fail("quota exceeded".to_string()),
        ScriptedTurn::text("never reached"),
    ]));
    let crew = DevCrew::new(client.clone(), CrewConfig::builtin().unwrap());

    let inputs = HashMap::from([("code_instructions".to_string(), "x".to_string())]);
    let err = crew.kickoff(&inputs).await.unwrap_err();

    assert!(matches!(err, CrewError::TaskFailed { task, .. } if task == "code_task"));
    assert_eq!(client.call_count(), 1);
}

#[tokio::test]
async fn test_load_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("agents.yaml"),
        "writer:\n  role: Writer\n  goal: Write\n  backstory: Writes things\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("tasks.yaml"),
        "draft:\n  description: Draft {topic}\n  expected_output: Text\n  agent: writer\n",
    )
    .unwrap();

    let config = CrewConfig::load(dir.path()).unwrap();
    let client = Arc::new(ScriptedChatClient::new(vec![ScriptedTurn::text("a draft")]));
    let crew = DevCrew::new(client.clone(), config).with_model("gemini-test");

    let inputs = HashMap::from([("topic".to_string(), "birds".to_string())]);
    let output = crew.kickoff(&inputs).await.unwrap();

    assert_eq!(output.final_output, "a draft");
    assert!(human_text(&client.requests()[0]).contains("Draft birds"));
}

#[test]
fn test_load_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let err = CrewConfig::load(dir.path().join("nope")).unwrap_err();
    assert!(matches!(err, CrewError::NotFound(_)));
}

#[tokio::test]
async fn test_coding_tool_returns_final_output() {
    let client = Arc::new(ScriptedChatClient::new(vec![
        ScriptedTurn::text("draft"),
        ScriptedTurn::text("final code"),
    ]));
    let tool = CodingTool::new(Arc::new(DevCrew::new(client, CrewConfig::builtin().unwrap())));

    let definition = tool.definition();
    assert_eq!(definition.name(), "coding_tool");

    let result = tool
        .execute(json!({"code_instructions": "fizzbuzz"}))
        .await
        .unwrap();
    assert_eq!(result, "final code");
}

#[tokio::test]
async fn test_coding_tool_rejects_bad_arguments() {
    let client = Arc::new(ScriptedChatClient::new(vec![]));
    let tool = CodingTool::new(Arc::new(DevCrew::new(client.clone(), CrewConfig::builtin().unwrap())));

    assert!(tool.execute(json!({"instructions": 1})).await.is_err());
    assert_eq!(client.call_count(), 0);
}

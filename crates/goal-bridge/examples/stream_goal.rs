use futures::StreamExt as _;
use goal_bridge::prelude::*;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), BridgeError> {
    let client = EngineClient::from_env()?;
    let goal_id = client
        .start_goal(&GoalRequest::new("List three facts about the Rust borrow checker."))
        .await?;

    let mut chunks = client.stream_goal(&goal_id).await?;
    while let Some(chunk) = chunks.next().await {
        match chunk? {
            OutputChunk::TextDelta { delta, .. } => print!("{delta}"),
            OutputChunk::ReasoningDelta { delta, .. } => eprintln!("[thinking] {delta}"),
            OutputChunk::DataAnnotation { content, .. } => eprintln!("[task] {content}"),
            OutputChunk::Error { message } => eprintln!("engine error: {message}"),
            OutputChunk::Finish { .. } => println!(),
            _ => {}
        }
    }
    Ok(())
}

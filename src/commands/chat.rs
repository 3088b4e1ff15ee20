use std::io::Write;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{until_interrupted, AppContext};
use crate::chat::{ChatSession, Speaker};
use crate::cli::ChatArgs;

pub async fn run(ctx: &AppContext, args: &ChatArgs) -> Result<()> {
    let client = ctx.client()?;
    let mut session = ChatSession::new();

    if let Some(message) = &args.message {
        let cancel = CancellationToken::new();
        let reply = until_interrupted(session.send(&client, message, &cancel), &cancel).await?;
        println!("{}", reply.text);
        return Ok(());
    }

    println!(
        "Chatting with {}. Type /history to review, /quit or Ctrl-D to leave.",
        client.model()
    );
    println!("This assistant is not a doctor and cannot diagnose anything.\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/history" => {
                for message in session.messages() {
                    let who = match message.speaker {
                        Speaker::User => "you",
                        Speaker::Assistant => "assistant",
                    };
                    println!("[{}] {}: {}", message.sent_at.format("%H:%M:%S"), who, message.text);
                }
            }
            text => {
                let cancel = CancellationToken::new();
                match until_interrupted(session.send(&client, text, &cancel), &cancel).await {
                    Ok(reply) => println!("assistant> {}\n", reply.text),
                    Err(e) => eprintln!("Error: {}\n", e),
                }
            }
        }
    }

    info!("Chat ended after {} messages", session.len());
    Ok(())
}

// Interactive terminal chat against a running flux-chat server.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::info;

use crate::conversation::{ConversationState, ImageGateway, Role, TranscriptEntry};
use crate::gateway_client::HttpGatewayClient;

pub async fn run_chat(server_url: &str) -> Result<ConversationState> {
    let client = HttpGatewayClient::new(server_url);
    info!("Starting chat session against {}", client.endpoint());
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_chat_session(stdin.lock(), stdout.lock(), &client).await
}

/// Reads prompts line by line until EOF or `/quit`, printing each new
/// transcript entry and any error.
pub async fn run_chat_session<R, W, G>(
    mut input: R,
    mut output: W,
    gateway: &G,
) -> Result<ConversationState>
where
    R: BufRead,
    W: Write,
    G: ImageGateway,
{
    let mut conversation = ConversationState::new();
    writeln!(output, "Describe the image you want to generate (/quit to exit).")?;

    loop {
        write!(output, "> ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line).context("Failed to read prompt")? == 0 {
            break;
        }
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim() == "/quit" {
            break;
        }

        let seen = conversation.transcript().len();
        conversation.set_draft(line);
        if !conversation.submit(gateway).await {
            continue;
        }

        for entry in &conversation.transcript().entries()[seen..] {
            print_entry(&mut output, entry)?;
        }
        if let Some(error) = conversation.error() {
            writeln!(output, "error: {}", error)?;
        }
    }

    writeln!(output, "Bye.")?;
    Ok(conversation)
}

fn print_entry<W: Write>(output: &mut W, entry: &TranscriptEntry) -> Result<()> {
    match entry.role {
        Role::User => writeln!(output, "you: {}", entry.content)?,
        Role::Assistant => {
            writeln!(output, "assistant: {}", entry.content)?;
            if let Some(url) = &entry.image_url {
                writeln!(output, "  {}", url)?;
            }
        }
    }
    Ok(())
}

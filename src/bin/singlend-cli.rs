use clap::Parser;
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "singlend-cli")]
#[command(about = "Send a {type, query} envelope to a singlend endpoint", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000/api/singlend")]
    url: String,

    /// Operation to invoke.
    #[arg(value_name = "TYPE")]
    type_name: String,

    /// Query as JSON text.
    #[arg(short, long, default_value = "{}")]
    query: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let query: Value = serde_json::from_str(&cli.query)?;

    let res = reqwest::Client::new()
        .post(&cli.url)
        .json(&json!({ "type": cli.type_name, "query": query }))
        .send()
        .await?;

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => {
            println!("{}", status);
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        Err(_) => {
            eprintln!("Error: endpoint returned status {}", status);
            eprintln!("Response: {}", text);
        }
    }
    Ok(())
}

use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    let port = std::env::var("PORT").unwrap_or_else(|_| "9283".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    println!("mock grocy listening on {addr} (API key: {})", mock_grocy::API_KEY);
    mock_grocy::run(listener, mock_grocy::demo_db()).await
}

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use wire_http::config::ServerConfig;
use wire_http::connection::HttpConnection;
use wire_http::handler::make_handler;
use wire_http::protocol::quality;
use wire_http::transport::proxy::ClientAddress;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!(port = 8080, "start listening");
    let tcp_listener = match TcpListener::bind("127.0.0.1:8080").await {
        Ok(tcp_listener) => tcp_listener,
        Err(e) => {
            error!(cause = %e, "bind server error");
            return;
        }
    };

    let config = ServerConfig::builder().read_timeout(Duration::from_secs(10)).build();
    let handler = Arc::new(make_handler(hello));
    loop {
        let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
            Ok(stream_and_addr) => stream_and_addr,
            Err(e) => {
                warn!(cause = %e, "failed to accept");
                continue;
            }
        };

        let handler = Arc::clone(&handler);
        let config = config.clone();
        tokio::spawn(async move {
            let (reader, writer) = tcp_stream.into_split();
            let connection = HttpConnection::with_config(reader, writer, config).with_peer(remote_addr);
            match connection.process(handler).await {
                Ok(()) => info!("finished process, connection shutdown"),
                Err(e) => error!("service has error, cause {}, connection shutdown", e),
            }
        });
    }
}

/// Greets the client by address and echoes its preferred languages.
async fn hello(request: Request<Bytes>) -> Result<Response<String>, Infallible> {
    let client = request.extensions().get::<ClientAddress>().map(|client| format!("{}:{}", client.address(), client.port()));
    let languages = quality::ordered(request.headers().get_all(http::header::ACCEPT_LANGUAGE).iter().filter_map(|v| v.to_str().ok()));

    let body = format!(
        "Hello {}!\r\nlanguages: {}\r\nbody: {} bytes\r\n",
        client.unwrap_or_else(|| "stranger".to_string()),
        languages.join(", "),
        request.body().len()
    );

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    Ok(response)
}

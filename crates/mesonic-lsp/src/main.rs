#![doc = include_str!("../README.md")]

use tower_lsp::{LspService, Server};

#[tokio::main]
async fn main() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(mesonic_lsp::MesonicLspBackend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}

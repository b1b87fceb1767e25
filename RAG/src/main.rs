// This binary target is a thin placeholder: the real HTTP server lives in
// the sibling `api` crate, which depends on `rag_core` as a library.

#[tokio::main]
async fn main() {
    println!("rag_core is a library crate; run the server from ../api instead.");
}

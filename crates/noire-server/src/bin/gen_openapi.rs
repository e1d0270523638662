use noire_server::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), serde_json::Error> {
    let spec = ApiDoc::openapi().to_pretty_json()?;
    println!("{spec}");
    Ok(())
}

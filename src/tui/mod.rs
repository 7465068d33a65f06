mod app;
mod ui;

use crate::config::Catalog;
use crate::error::Result;

pub use app::{App, Display, Focus, HitMap};

/// Run the interactive cart
pub fn run(catalog: &Catalog, code: Option<&str>) -> Result<()> {
    let mut app = App::new(catalog)?;
    app.start(code);
    app.run()
}

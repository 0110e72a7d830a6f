use crate::RouteTable;
use crate::SITE_NAME;
use lb_core::BridgeError;
use lb_core::BridgeResult;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    site_name: Option<String>,
    #[serde(rename = "page", default)]
    pages: Vec<PageRow>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageRow {
    route: String,
    document: String,
    title: String,
}

impl RouteTable {
    /// Loads a table from TOML:
    ///
    /// ```toml
    /// site_name = "CentralKastoriaHouses"
    ///
    /// [[page]]
    /// route = "/"
    /// document = "index.html"
    /// title = "Home"
    /// ```
    pub fn from_toml_str(source: &str) -> BridgeResult<Self> {
        let file: TableFile = toml::from_str(source).map_err(|error| {
            BridgeError::new(
                "routes.table.parse_failed",
                format!("failed to parse route table: {error}"),
            )
        })?;

        let table = Self::new(
            file.site_name.unwrap_or_else(|| SITE_NAME.to_owned()),
            file.pages
                .into_iter()
                .map(|page| (page.route, page.document, page.title)),
        )?;
        log::debug!(target: "lb::routes", "loaded route table with {} pages", table.len());
        Ok(table)
    }
}

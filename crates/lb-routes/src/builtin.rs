use crate::LegacyDocumentId;
use crate::Route;
use crate::RouteEntry;
use crate::RouteTable;

/// Site name used as the title of unresolved locations.
pub const SITE_NAME: &str = "CentralKastoriaHouses";

const BUILTIN_PAGES: &[(&str, &str, &str)] = &[
    (
        "/",
        "index.html",
        "Central Kastoria Houses - Rent Your Dream Apartment | CentralKastoriaHouses",
    ),
    (
        "/diamerismata",
        "diamerismata.html",
        "Rent Charming Apartments in Central Kastoria Today! | CentralKastoriaHouses",
    ),
    (
        "/topo8esia",
        "topo8esia.html",
        "Central Kastoria Houses - Rent Apartments in Kastoria | CentralKastoriaHouses",
    ),
    (
        "/epikoinwnia",
        "epikoinwnia.html",
        "Contact Centralkastoriahouses for Apartment Rentals in Kastoria | CentralKastoriaHouses",
    ),
    (
        "/centralkastoriahouseone",
        "centralkastoriahouseone.html",
        "Discover Central Kastoria Houses | CentralKastoriaHouses",
    ),
    (
        "/centralkastoriahousetwo",
        "centralkastoriahousetwo.html",
        "Explore Central Kastoria House Photo Gallery | CentralKastoriaHouses",
    ),
];

impl RouteTable {
    /// The site's fixed page table.
    pub fn builtin() -> Self {
        Self {
            site_name: SITE_NAME.to_owned(),
            entries: BUILTIN_PAGES
                .iter()
                .map(|(route, document, title)| RouteEntry {
                    route: Route((*route).to_owned()),
                    document: LegacyDocumentId((*document).to_owned()),
                    title: (*title).to_owned(),
                })
                .collect(),
        }
    }
}

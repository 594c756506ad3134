//! `biodl list` – print the catalog.

use biodl_core::Catalog;

pub fn run_list(catalog: &Catalog) {
    let width = catalog.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    for (key, url) in catalog.iter() {
        println!("{:<width$}  {}", key, url, width = width);
    }
}

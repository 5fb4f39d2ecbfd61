//! Search synonyms
//!
//! Alternate spellings and translations that map onto a food name. Search
//! treats an exact synonym hit as a search for every food whose name
//! contains the primary name.

use rusqlite::{params, Connection};

use crate::db::DbResult;

/// (primary name, synonym, language)
pub const SYNONYMS: &[(&str, &str, &str)] = &[
    ("Banana", "bananas", "en"),
    ("Banana", "banana fruit", "en"),
    ("Chicken Breast", "chicken", "en"),
    ("Chicken Breast", "boneless chicken", "en"),
    ("Egg", "eggs", "en"),
    ("Egg", "whole egg", "en"),
    // Misspellings
    ("Broccoli", "brocolli", "en"),
    ("Broccoli", "brocoli", "en"),
    ("Avocado", "avacado", "en"),
    ("Avocado", "aguacate", "es"),
    ("Apple", "manzana", "es"),
    ("Apple", "pomme", "fr"),
    ("Rice", "arroz", "es"),
    ("Rice", "riz", "fr"),
    ("Chicken", "pollo", "es"),
    ("Chicken", "poulet", "fr"),
];

/// Insert the built-in synonyms, skipping pairs already present
///
/// Returns the number of new rows.
pub fn write_synonyms(conn: &Connection) -> DbResult<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO food_synonyms (primary_name, synonym, language) VALUES (?1, ?2, ?3)",
    )?;
    let mut inserted = 0;
    for (primary, synonym, language) in SYNONYMS {
        inserted += stmt.execute(params![primary, synonym.to_lowercase(), language])?;
    }
    Ok(inserted)
}

/// Primary names registered for a search term
pub fn primary_names(conn: &Connection, term: &str) -> DbResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT primary_name FROM food_synonyms WHERE synonym = ?1 ORDER BY primary_name",
    )?;
    let names = stmt
        .query_map([term.trim().to_lowercase()], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    #[test]
    fn test_write_synonyms_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(write_synonyms(&conn).unwrap(), SYNONYMS.len());
        assert_eq!(write_synonyms(&conn).unwrap(), 0);
    }

    #[test]
    fn test_primary_names_case_insensitive() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        write_synonyms(&conn).unwrap();

        assert_eq!(primary_names(&conn, " Pollo ").unwrap(), vec!["Chicken"]);
        assert_eq!(primary_names(&conn, "chicken").unwrap(), vec!["Chicken Breast"]);
        assert!(primary_names(&conn, "taco").unwrap().is_empty());
    }
}

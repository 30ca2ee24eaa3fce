#![allow(dead_code)]

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

pub fn suite_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../suites")
        .join(name)
}

/// Small stand-in for the stage-06 movies snapshot, shaped so every scenario
/// in `suites/movies.yaml` reproduces its recorded result.
pub fn build_movies(path: &Path) -> anyhow::Result<()> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(
        "CREATE TABLE movies (id INTEGER PRIMARY KEY, original_title TEXT, budget_adjusted REAL);
         CREATE TABLE directors (id INTEGER PRIMARY KEY, full_name TEXT);
         CREATE TABLE movie_directors (movie_id INTEGER, director_id INTEGER);
         CREATE TABLE actors (id INTEGER PRIMARY KEY, full_name TEXT);
         CREATE TABLE movie_actors (movie_id INTEGER, actor_id INTEGER);
         CREATE TABLE keywords (id INTEGER PRIMARY KEY, keyword TEXT);
         CREATE TABLE movie_keywords (movie_id INTEGER, keyword_id INTEGER);
         CREATE TABLE genres (id INTEGER PRIMARY KEY, genre TEXT);
         CREATE TABLE movie_genres (movie_id INTEGER, genre_id INTEGER);
         CREATE TABLE movie_ratings (movie_id INTEGER, rating REAL);",
    )?;

    let tx = conn.transaction()?;
    {
        let mut movie = tx.prepare("INSERT INTO movies (id, original_title, budget_adjusted) VALUES (?1, ?2, ?3)")?;
        let mut directed = tx.prepare("INSERT INTO movie_directors (movie_id, director_id) VALUES (?1, ?2)")?;
        let films: [(i64, &str, f64, i64); 6] = [
            (1, "Gladiator", 700_000_000.0, 1),
            (2, "Prometheus", 22_882_143.58, 1),
            (3, "Transformers", 518_297_522.1, 2),
            (4, "Deathly Hallows", 504_100_108.5, 3),
            (5, "Following", 6_000.0, 4),
            (6, "Life", 58_000_000.0, 5),
        ];
        for (id, title, budget, director) in films {
            movie.execute(params![id, title, budget])?;
            directed.execute(params![id, director])?;
        }

        let mut director = tx.prepare("INSERT INTO directors (id, full_name) VALUES (?1, ?2)")?;
        for (id, name) in [
            (1, "Ridley Scott"),
            (2, "Michael Bay"),
            (3, "David Yates"),
            (4, "Christopher Nolan"),
            (5, "Daniel Espinosa"),
        ] {
            director.execute(params![id, name])?;
        }

        let mut actor = tx.prepare("INSERT INTO actors (id, full_name) VALUES (?1, ?2)")?;
        let mut cast = tx.prepare("INSERT INTO movie_actors (movie_id, actor_id) VALUES (?1, ?2)")?;
        for id in 1..=12 {
            actor.execute(params![id, format!("Actor {id}")])?;
            cast.execute(params![6, id])?;
        }

        let mut keyword = tx.prepare("INSERT INTO keywords (id, keyword) VALUES (?1, ?2)")?;
        let mut tagged = tx.prepare("INSERT INTO movie_keywords (movie_id, keyword_id) VALUES (?1, ?2)")?;
        let counts = [
            ("woman director", 162),
            ("independent film", 115),
            ("based on novel", 85),
            ("duringcreditsstinger", 82),
            ("biography", 78),
            ("murder", 66),
            ("sex", 60),
            ("revenge", 51),
            ("sport", 50),
            ("high school", 48),
            ("dystopia", 12),
        ];
        for (i, (word, n)) in counts.iter().enumerate() {
            let kid = i as i64 + 1;
            keyword.execute(params![kid, word])?;
            for m in 0..*n {
                tagged.execute(params![(m % 6) + 1, kid])?;
            }
        }

        let mut genre = tx.prepare("INSERT INTO genres (id, genre) VALUES (?1, ?2)")?;
        let mut classed = tx.prepare("INSERT INTO movie_genres (movie_id, genre_id) VALUES (?1, ?2)")?;
        let mut rated = tx.prepare("INSERT INTO movie_ratings (movie_id, rating) VALUES (?1, ?2)")?;
        // (genre, [(rating, how many)]); one rated movie per genre
        let ratings: [(&str, &[(f64, u32)]); 5] = [
            ("Drama", &[(5.0, 15052), (1.0, 20000)]),
            ("Thriller", &[(5.0, 11771), (1.0, 15000)]),
            ("Crime", &[(5.0, 8670), (1.0, 3760)]),
            ("Music", &[(4.0, 73), (3.0, 27)]),
            ("Documentary", &[(4.0, 71), (3.0, 29)]),
        ];
        for (i, (name, spread)) in ratings.iter().enumerate() {
            let gid = i as i64 + 1;
            let movie_id = 100 + gid;
            genre.execute(params![gid, name])?;
            classed.execute(params![movie_id, gid])?;
            for (rating, n) in spread.iter() {
                for _ in 0..*n {
                    rated.execute(params![movie_id, rating])?;
                }
            }
        }
    }
    tx.commit()?;
    Ok(())
}

/// Stand-in for the stage-03 shopify snapshot.
pub fn build_shopify(path: &Path) -> anyhow::Result<()> {
    let mut conn = Connection::open(path)?;
    conn.execute_batch(
        "CREATE TABLE apps (id INTEGER PRIMARY KEY, title TEXT);
         CREATE TABLE categories (id INTEGER PRIMARY KEY, title TEXT);
         CREATE TABLE apps_categories (app_id INTEGER, category_id INTEGER);
         CREATE TABLE pricing_plans (id TEXT PRIMARY KEY, price TEXT);
         CREATE TABLE apps_pricing_plans (app_id INTEGER, pricing_plan_id TEXT);",
    )?;

    let tx = conn.transaction()?;
    {
        let mut app = tx.prepare("INSERT INTO apps (id, title) VALUES (?1, ?2)")?;
        for id in 1..=1200 {
            app.execute(params![id, format!("App {id}")])?;
        }

        let mut category = tx.prepare("INSERT INTO categories (id, title) VALUES (?1, ?2)")?;
        let mut in_category = tx.prepare("INSERT INTO apps_categories (app_id, category_id) VALUES (?1, ?2)")?;
        let categories = [
            ("Store design", 1193),
            ("Sales and conversion optimization", 723),
            ("Marketing", 629),
            ("Reporting", 100),
        ];
        for (i, (title, n)) in categories.iter().enumerate() {
            let cid = i as i64 + 1;
            category.execute(params![cid, title])?;
            for a in 0..*n {
                in_category.execute(params![(a % 1200) + 1, cid])?;
            }
        }

        let mut plan = tx.prepare("INSERT INTO pricing_plans (id, price) VALUES (?1, ?2)")?;
        let mut priced = tx.prepare("INSERT INTO apps_pricing_plans (app_id, pricing_plan_id) VALUES (?1, ?2)")?;
        let plans = [
            ("1", "Free", 1000),
            ("13", "Free to install", 112),
            ("20", "$9.99/month", 225),
            ("21", "$5/month", 135),
            ("22", "$10/month", 114),
            ("23", "$7/month", 50),
            ("24", "$15/month", 300),
        ];
        for (id, price, n) in plans {
            plan.execute(params![id, price])?;
            for a in 0..n {
                priced.execute(params![(a % 1200) + 1, id])?;
            }
        }
    }
    tx.commit()?;
    Ok(())
}

use std::sync::Arc;

use log::error;
use tabula_engine::driver::SqliteDriver;
use tabula_engine::tables::{Comment, CommentTable, MetadataTable};

fn main() {
    let driver = match SqliteDriver::open_in_memory() {
        Ok(driver) => Arc::new(driver),
        Err(err) => {
            error!("err: {}", err);
            return;
        }
    };

    let mut comments = match CommentTable::new(driver.clone()) {
        Ok(table) => table,
        Err(err) => {
            error!("err: {}", err);
            return;
        }
    };
    let mut metadata = MetadataTable::new(driver);

    if let Err(err) = comments.init().map(|_| ()) {
        error!("err: {}", err);
        return;
    }
    if let Err(err) = metadata.init().map(|_| ()) {
        error!("err: {}", err);
        return;
    }

    let dataset = vec![
        ("t1_jansen", "what a lovely thread"),
        ("t1_bonega", "strongly disagree with the parent"),
        ("t1_lorem", "posting this for posterity"),
        ("t1_rango", "came here to say exactly this"),
    ];

    let records: Vec<Comment> = dataset
        .iter()
        .map(|(name, body)| Comment {
            name: name.to_string(),
            article_name: "t3_article".to_string(),
            body: body.to_string(),
            body_index: body.to_string(),
            score: Some(1),
            ..Comment::default()
        })
        .collect();

    if let Err(err) = comments.set(&records) {
        println!("err: {}", err);
    }

    if let Err(err) = metadata.set(&[("schema_version", "2")]) {
        println!("err: {}", err);
    }

    match comments.scan() {
        Ok(rows) => {
            for row in rows {
                println!("{} | {}", row.name, row.body);
            }
        }
        Err(err) => println!("err: {}", err),
    }

    match metadata.get("schema_version") {
        Ok(version) => println!("schema_version = {:?}", version),
        Err(err) => println!("err: {}", err),
    }
}

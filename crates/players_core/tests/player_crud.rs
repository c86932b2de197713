use players_core::db::migrations::player_migrator;
use players_core::{
    DatabaseQueue, DatabaseReader, DatabaseWriter, Player, PlayerRepository, RepoError,
    RepoResult, SqlitePlayerRepository,
};

fn migrated_queue() -> DatabaseQueue {
    let queue = DatabaseQueue::new().unwrap();
    player_migrator().migrate(&queue).unwrap();
    queue
}

fn seed(queue: &DatabaseQueue, players: &[(&str, i64)]) -> Vec<Player> {
    queue
        .write(|tx| -> RepoResult<Vec<Player>> {
            let repo = SqlitePlayerRepository::new(tx);
            let mut saved = Vec::new();
            for (name, score) in players {
                let mut player = Player::new(*name, *score);
                repo.insert_player(&mut player)?;
                saved.push(player);
            }
            Ok(saved)
        })
        .unwrap()
}

#[test]
fn insert_and_get_roundtrip() {
    let queue = migrated_queue();
    let saved = seed(&queue, &[("Arthur", 1000)]);

    let loaded = queue
        .read(|conn| SqlitePlayerRepository::new(conn).get_player(saved[0].id.unwrap()))
        .unwrap();
    assert_eq!(loaded, Some(saved[0].clone()));
}

#[test]
fn update_existing_player() {
    let queue = migrated_queue();
    let mut player = seed(&queue, &[("Arthur", 1000)]).remove(0);

    player.name = "Arthur Dent".to_string();
    player.score = 42;
    queue
        .write(|tx| SqlitePlayerRepository::new(tx).update_player(&player))
        .unwrap();

    let loaded = queue.read(Player::fetch_one).unwrap().unwrap();
    assert_eq!(loaded, player);
}

#[test]
fn update_missing_row_returns_not_found() {
    let queue = migrated_queue();
    let player = Player {
        id: Some(404),
        name: "Ghost".to_string(),
        score: 0,
    };

    let err = queue
        .write(|tx| SqlitePlayerRepository::new(tx).update_player(&player))
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(404)));
}

#[test]
fn save_inserts_then_updates() {
    let queue = migrated_queue();
    let mut player = Player::new("Ford", 5);

    let first_id = queue
        .write(|tx| SqlitePlayerRepository::new(tx).save_player(&mut player))
        .unwrap();
    player.score = 6;
    let second_id = queue
        .write(|tx| SqlitePlayerRepository::new(tx).save_player(&mut player))
        .unwrap();

    assert_eq!(first_id, second_id);
    let count = queue
        .read(|conn| SqlitePlayerRepository::new(conn).count_players())
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn inserting_an_already_stored_player_fails() {
    let queue = migrated_queue();
    let mut existing = seed(&queue, &[("Arthur", 1)]).remove(0);
    let id = existing.id.unwrap();

    let err = queue
        .write(|tx| SqlitePlayerRepository::new(tx).insert_player(&mut existing))
        .unwrap_err();
    assert!(matches!(err, RepoError::AlreadyPersisted(found) if found == id));
    assert_eq!(queue.read(Player::fetch_count).unwrap(), 1);
}

#[test]
fn fetch_all_returns_players_in_id_order() {
    let queue = migrated_queue();
    let saved = seed(&queue, &[("Arthur", 10), ("Ford", 30), ("Zaphod", 40)]);

    let loaded = queue.read(Player::fetch_all).unwrap();
    assert_eq!(loaded, saved);
}

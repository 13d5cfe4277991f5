//! Roster Repository - Live Player List
//!
//! Keeps an always-current, decoded copy of `players` and performs the
//! add / edit / delete operations of the roster screen.
//!
//! The local view is only ever replaced from store notifications; writes
//! go to the store and come back through the live listener like any
//! other client's change.

use std::sync::Arc;

use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::paths;
use super::uploader::ImageUploader;
use crate::domain::{Player, PlayerDraft, PlayerRecord, PlayerUpdate};
use crate::error::{Error, Result, StoreError};
use crate::ports::store::{RemoteStore, Subscription};

/// Live roster backed by the store.
///
/// Owns the listener on `players`; dropping the repository (or calling
/// [`RosterRepository::close`]) detaches it.
pub struct RosterRepository {
  /// Store port.
  store: Arc<dyn RemoteStore>,
  /// Latest decoded roster, ordered by id (creation order).
  view: watch::Receiver<Vec<Player>>,
  /// Task applying store notifications to `view`.
  sync_task: JoinHandle<()>,
}

impl RosterRepository {
  /// Subscribe to `players` and wait for the first snapshot.
  #[instrument(skip(store))]
  pub async fn open(store: Arc<dyn RemoteStore>) -> Result<Self> {
    let subscription = store
      .subscribe(&paths::players())
      .await
      .map_err(|e| Error::store("Failed to load roster", e))?;
    let initial = decode_roster(subscription.current())
      .map_err(|e| Error::store("Failed to load roster", e))?;
    info!(players = initial.len(), "Roster loaded");

    let (tx, view) = watch::channel(initial);
    let sync_task = tokio::spawn(sync_roster(subscription, tx));

    Ok(Self {
      store,
      view,
      sync_task,
    })
  }

  /// Current roster.
  pub fn players(&self) -> Vec<Player> {
    self.view.borrow().clone()
  }

  pub fn len(&self) -> usize {
    self.view.borrow().len()
  }

  pub fn is_empty(&self) -> bool {
    self.view.borrow().is_empty()
  }

  /// Receiver that wakes on every roster change.
  pub fn watch(&self) -> watch::Receiver<Vec<Player>> {
    self.view.clone()
  }

  /// Player with `id`, if on the current roster.
  pub fn get(&self, id: &str) -> Option<Player> {
    self.view.borrow().iter().find(|p| p.id == id).cloned()
  }

  /// Players matching `query` on name, number or position.
  pub fn search(&self, query: &str) -> Vec<Player> {
    self
      .view
      .borrow()
      .iter()
      .filter(|p| p.matches(query))
      .cloned()
      .collect()
  }

  /// Validate `draft` and store it under a fresh id.
  ///
  /// Returns the player as written. The roster view picks it up from the
  /// store notification, not from this call.
  #[instrument(skip(self, draft), fields(name = %draft.name))]
  pub async fn create(&self, draft: &PlayerDraft) -> Result<Player> {
    let record = draft.validate().inspect_err(|e| {
      debug!(error = %e, "Player draft rejected");
    })?;
    self.insert(record).await
  }

  /// Upload a photo, then create the player with its download URL.
  ///
  /// The draft is validated first so a rejected form never uploads.
  #[instrument(skip(self, draft, uploader, bytes), fields(name = %draft.name, file = file_name))]
  pub async fn create_with_photo(
    &self,
    draft: &PlayerDraft,
    uploader: &ImageUploader,
    bytes: Vec<u8>,
    file_name: &str,
  ) -> Result<Player> {
    let mut record = draft.validate()?;
    let url = uploader.upload(bytes, file_name).await?;
    record.photo_url = Some(url);
    self.insert(record).await
  }

  async fn insert(&self, record: PlayerRecord) -> Result<Player> {
    let path = self.store.append(&paths::players());
    self
      .store
      .write(&path, &record.to_value())
      .await
      .map_err(|e| Error::store("Failed to add player", e))?;

    let id = path.key().unwrap_or_default().to_string();
    info!(player = %id, number = record.number, "Player added");
    Ok(Player::from_record(id, record))
  }

  /// Apply a partial edit to an existing player.
  ///
  /// Only the listed fields change. The record is rewritten against the
  /// revision it was read at, so an edit never recreates a player deleted
  /// in the meantime.
  ///
  /// # Errors
  /// `Error::NotFound` if the player does not exist. A concurrent change
  /// to the record fails with `StoreError::PreconditionFailed`.
  #[instrument(skip(self, update))]
  pub async fn update(&self, id: &str, update: &PlayerUpdate) -> Result<()> {
    let fields: Map<String, Value> = update.to_fields()?;
    if fields.is_empty() {
      debug!("Empty update, nothing to write");
      return Ok(());
    }

    let path = paths::player(id)?;
    let current = self
      .store
      .read_versioned(&path)
      .await
      .map_err(|e| Error::store("Failed to update player", e))?;
    let Some(Value::Object(mut record)) = current.value else {
      return Err(Error::NotFound {
        context: "Failed to update player",
        path: path.to_string(),
      });
    };

    for (field, value) in &fields {
      if value.is_null() {
        record.remove(field);
      } else {
        record.insert(field.clone(), value.clone());
      }
    }

    self
      .store
      .write_if(&path, &Value::Object(record), &current.revision)
      .await
      .map_err(|e| Error::store("Failed to update player", e))?;
    info!(player = id, fields = fields.len(), "Player updated");
    Ok(())
  }

  /// Remove a player. Removing an unknown id succeeds.
  ///
  /// Attendance entries for the player are kept.
  #[instrument(skip(self))]
  pub async fn delete(&self, id: &str) -> Result<()> {
    let path = paths::player(id)?;
    self
      .store
      .delete(&path)
      .await
      .map_err(|e| Error::store("Failed to delete player", e))?;
    info!(player = id, "Player removed");
    Ok(())
  }

  /// Stop listening for roster changes.
  pub fn close(self) {}
}

impl Drop for RosterRepository {
  fn drop(&mut self) {
    self.sync_task.abort();
  }
}

/// Apply every roster snapshot to `tx` until the store or all readers go away.
async fn sync_roster(mut subscription: Subscription, tx: watch::Sender<Vec<Player>>) {
  loop {
    let snapshot = tokio::select! {
      () = tx.closed() => break,
      next = subscription.changed() => next,
    };
    match snapshot {
      Ok(value) => match decode_roster(value) {
        Ok(players) => {
          let changed = tx.send_if_modified(|current| {
            if *current == players {
              false
            } else {
              *current = players;
              true
            }
          });
          if changed {
            debug!(players = tx.borrow().len(), "Roster changed");
          }
        }
        Err(e) => warn!(error = %e, "Ignoring malformed roster snapshot"),
      },
      Err(e) => {
        warn!(error = %e, "Roster listener closed");
        break;
      }
    }
  }
  subscription.unsubscribe();
}

/// Decode the `players` snapshot.
///
/// A missing value is an empty roster. Records that do not decode are
/// skipped with a warning; a snapshot that is not an object is an error.
pub fn decode_roster(value: Option<Value>) -> std::result::Result<Vec<Player>, StoreError> {
  let Some(value) = value else {
    return Ok(Vec::new());
  };
  let children: Map<String, Value> =
    serde_json::from_value(value).map_err(|source| StoreError::Decode {
      path: paths::PLAYERS.to_string(),
      source,
    })?;

  Ok(
    children
      .into_iter()
      .filter_map(|(id, raw)| {
        let record = match serde_json::from_value::<PlayerRecord>(raw) {
          Ok(record) => record,
          Err(e) => {
            warn!(player = %id, error = %e, "Skipping malformed player record");
            return None;
          }
        };
        if let Err(e) = record.check() {
          warn!(player = %id, error = %e, "Skipping invalid player record");
          return None;
        }
        Some(Player::from_record(id, record))
      })
      .collect(),
  )
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::adapters::store::MemoryStore;
  use crate::domain::Position;
  use crate::error::ValidationError;

  async fn wait_for(rx: &mut watch::Receiver<Vec<Player>>, len: usize) -> Vec<Player> {
    tokio::time::timeout(
      std::time::Duration::from_secs(1),
      rx.wait_for(|players| players.len() == len),
    )
    .await
    .unwrap()
    .unwrap()
    .clone()
  }

  #[test]
  fn test_decode_skips_malformed_records() {
    let players = decode_roster(Some(json!({
      "a": {"name": "Alex", "number": 7, "position": "Center"},
      "b": {"name": "Broken"},
      "c": {"name": "Cam", "number": 12, "position": "Power Forward", "photoURL": "u"}
    })))
    .unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].id, "a");
    assert_eq!(players[1].photo_url.as_deref(), Some("u"));
    assert!(decode_roster(None).unwrap().is_empty());
    assert!(decode_roster(Some(json!("nope"))).is_err());
  }

  #[test]
  fn test_decode_skips_records_breaking_roster_rules() {
    let players = decode_roster(Some(json!({
      "p1": {"name": "Big", "number": 150, "position": "Center"},
      "p2": {"name": "  ", "number": 5, "position": "Center"},
      "p3": {"name": "Kai", "number": 99, "position": "Point Guard"}
    })))
    .unwrap();
    assert_eq!(players.len(), 1);
    assert_eq!(players[0].id, "p3");
    assert_eq!(players[0].number, 99);
  }

  #[tokio::test]
  async fn test_create_then_visible_in_view() {
    let store = MemoryStore::new();
    let roster = RosterRepository::open(Arc::new(store.clone())).await.unwrap();
    assert!(roster.is_empty());

    let player = roster
      .create(&PlayerDraft::new(" Alex ", "7", "Center"))
      .await
      .unwrap();
    assert_eq!(player.name, "Alex");

    let mut rx = roster.watch();
    let players = wait_for(&mut rx, 1).await;
    assert_eq!(players[0], player);
    assert_eq!(roster.get(&player.id).unwrap().position, Position::Center);
  }

  #[tokio::test]
  async fn test_invalid_draft_writes_nothing() {
    let store = MemoryStore::new();
    let roster = RosterRepository::open(Arc::new(store.clone())).await.unwrap();
    let err = roster
      .create(&PlayerDraft::new("Sam", "150", "Center"))
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      Error::Validation(ValidationError::NumberOutOfRange(150))
    ));
    assert_eq!(store.snapshot(), Value::Null);
  }

  #[tokio::test]
  async fn test_update_missing_player() {
    let roster = RosterRepository::open(Arc::new(MemoryStore::new())).await.unwrap();
    let err = roster
      .update("ghost", &PlayerUpdate::default().name("Casper"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
  }

  #[tokio::test]
  async fn test_close_detaches_listener() {
    let store = MemoryStore::new();
    let roster = RosterRepository::open(Arc::new(store.clone())).await.unwrap();
    assert_eq!(store.listener_count(), 1);
    roster.close();
    for _ in 0..10 {
      if store.listener_count() == 0 {
        break;
      }
      tokio::task::yield_now().await;
    }
    assert_eq!(store.listener_count(), 0);
  }
}

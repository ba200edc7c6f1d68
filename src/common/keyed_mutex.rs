//! Fila de mutações por entidade.
//!
//! Escritas concorrentes sobre a mesma chave (ex.: o mesmo cliente) são
//! executadas uma de cada vez, na ordem de chegada ao mutex do tokio.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Slots<K> = Arc<Mutex<HashMap<K, Arc<AsyncMutex<()>>>>>;

pub struct KeyedMutex<K> {
    slots: Slots<K>,
}

impl<K> Clone for KeyedMutex<K> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
        }
    }
}

impl<K> Default for KeyedMutex<K> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

pub struct KeyedGuard<K: Eq + Hash> {
    slots: Slots<K>,
    key: K,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> KeyedMutex<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Espera a vez da chave. A vaga é liberada quando o guard é descartado.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slots.entry(key.clone()).or_default())
        };

        let guard = slot.lock_owned().await;

        KeyedGuard {
            slots: Arc::clone(&self.slots),
            key,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl<K: Eq + Hash> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(guard) = self.guard.take() {
            // mapa + este guard: ninguém mais esperando
            if Arc::strong_count(OwnedMutexGuard::mutex(&guard)) == 2 {
                slots.remove(&self.key);
            }
            drop(guard);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_runs_one_at_a_time_in_arrival_order() {
        let locks: KeyedMutex<u32> = KeyedMutex::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = locks.lock(7).await;

        let task = {
            let locks = locks.clone();
            let log = Arc::clone(&log);
            tokio::spawn(async move {
                let _g = locks.lock(7).await;
                log.lock().unwrap().push("second");
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        log.lock().unwrap().push("first");
        drop(first);
        task.await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn different_keys_do_not_block_each_other() {
        let locks: KeyedMutex<u32> = KeyedMutex::new();
        let _a = locks.lock(1).await;
        let b = tokio::time::timeout(Duration::from_millis(50), locks.lock(2)).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn idle_keys_are_forgotten() {
        let locks: KeyedMutex<u32> = KeyedMutex::new();
        {
            let _g = locks.lock(1).await;
            assert_eq!(locks.tracked_keys(), 1);
        }
        assert_eq!(locks.tracked_keys(), 0);
    }
}

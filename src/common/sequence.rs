//! Guarda contra respostas de busca obsoletas.
//!
//! O cliente envia um número de sequência crescente por escopo lógico
//! (usuário + escopo). Uma busca só é respondida com dados se, ao começar
//! e ao terminar, ainda for a mais recente daquele escopo. Os escopos são
//! fechados, então o mapa tem no máximo uma entrada por escopo de cada usuário.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use uuid::Uuid;

/// Tela que originou a busca.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SearchScope {
    #[default]
    Customers,
    StartChat,
}

impl SearchScope {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "customers" => Some(Self::Customers),
            "start-chat" => Some(Self::StartChat),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::StartChat => "start-chat",
        }
    }
}

type ScopeKey = (Uuid, SearchScope);

#[derive(Clone, Default)]
pub struct SearchSequencer {
    latest: Arc<Mutex<HashMap<ScopeKey, u64>>>,
}

/// Bilhete de uma busca aceita; permite conferir se continua atual.
pub struct SearchTicket {
    latest: Arc<Mutex<HashMap<ScopeKey, u64>>>,
    key: ScopeKey,
    seq: u64,
}

impl SearchSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra a sequência. Retorna `None` se uma sequência maior já foi vista.
    pub fn begin(&self, user_id: Uuid, scope: SearchScope, seq: u64) -> Option<SearchTicket> {
        let key = (user_id, scope);
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        let current = latest.entry(key).or_insert(seq);
        if seq < *current {
            return None;
        }
        *current = seq;

        Some(SearchTicket {
            latest: Arc::clone(&self.latest),
            key,
            seq,
        })
    }
}

impl SearchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Falso se outra busca mais nova do mesmo escopo começou depois desta.
    pub fn is_current(&self) -> bool {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        latest.get(&self.key).is_none_or(|highest| *highest == self.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_sequence_is_rejected_up_front() {
        let seq = SearchSequencer::new();
        let user = Uuid::new_v4();

        assert!(seq.begin(user, SearchScope::Customers, 3).is_some());
        assert!(seq.begin(user, SearchScope::Customers, 2).is_none());
        assert!(seq.begin(user, SearchScope::Customers, 3).is_some());
    }

    #[test]
    fn superseded_search_is_no_longer_current() {
        let seq = SearchSequencer::new();
        let user = Uuid::new_v4();

        let first = seq.begin(user, SearchScope::Customers, 1).unwrap();
        let second = seq.begin(user, SearchScope::Customers, 2).unwrap();

        assert!(!first.is_current());
        assert!(second.is_current());
    }

    #[test]
    fn scopes_and_users_are_independent() {
        let seq = SearchSequencer::new();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();

        let list = seq.begin(user, SearchScope::Customers, 10).unwrap();
        assert!(seq.begin(user, SearchScope::StartChat, 1).is_some());
        assert!(seq.begin(other, SearchScope::Customers, 1).is_some());
        assert!(list.is_current());
    }

    #[test]
    fn only_known_scopes_are_accepted() {
        assert_eq!(SearchScope::parse("customers"), Some(SearchScope::Customers));
        assert_eq!(SearchScope::parse(" start-chat "), Some(SearchScope::StartChat));
        assert_eq!(SearchScope::parse("scope-123"), None);
        assert_eq!(SearchScope::parse(""), None);
    }

    #[test]
    fn entries_stay_bounded_per_user() {
        let seq = SearchSequencer::new();
        let user = Uuid::new_v4();
        for n in 0..50 {
            seq.begin(user, SearchScope::Customers, n);
            seq.begin(user, SearchScope::StartChat, n);
        }
        let latest = seq.latest.lock().unwrap();
        assert_eq!(latest.len(), 2);
    }
}

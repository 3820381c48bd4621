use anyhow::Result;
use commonware_cryptography::ed25519::PublicKey;
use greenbox_types::execution::{Account, Key, Value};
use std::future::Future;

#[cfg(any(test, feature = "mocks"))]
use std::collections::HashMap;

#[derive(Debug)]
pub enum PrepareError {
    NonceMismatch { expected: u64, got: u64 },
    State(anyhow::Error),
}

pub trait State {
    fn get(&self, key: &Key) -> impl Future<Output = Result<Option<Value>>>;
    fn insert(&mut self, key: Key, value: Value) -> impl Future<Output = Result<()>>;
    fn delete(&mut self, key: &Key) -> impl Future<Output = Result<()>>;

    fn apply(&mut self, changes: Vec<(Key, Status)>) -> impl Future<Output = Result<()>> {
        async {
            for (key, status) in changes {
                match status {
                    Status::Update(value) => self.insert(key, value).await?,
                    Status::Delete => self.delete(&key).await?,
                }
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "mocks"))]
#[derive(Default)]
pub struct Memory {
    state: HashMap<Key, Value>,
}

#[cfg(any(test, feature = "mocks"))]
impl Memory {
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }
}

#[cfg(any(test, feature = "mocks"))]
impl State for Memory {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(self.state.get(key).cloned())
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.state.insert(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.state.remove(key);
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Update(Value),
    Delete,
}

pub async fn nonce<S: State>(state: &S, public: &PublicKey) -> Result<u64> {
    Ok(load_account(state, public).await?.nonce)
}

pub(crate) async fn load_account<S: State>(state: &S, public: &PublicKey) -> Result<Account> {
    Ok(match state.get(&Key::Account(public.clone())).await? {
        Some(Value::Account(account)) => account,
        _ => Account::default(),
    })
}

pub(crate) fn validate_and_increment_nonce(
    account: &mut Account,
    provided_nonce: u64,
) -> Result<(), PrepareError> {
    if account.nonce != provided_nonce {
        return Err(PrepareError::NonceMismatch {
            expected: account.nonce,
            got: provided_nonce,
        });
    }
    account.nonce += 1;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_cryptography::{ed25519::PrivateKey, Signer};

    #[tokio::test]
    async fn apply_inserts_and_deletes() {
        let mut state = Memory::default();
        state
            .apply(vec![
                (Key::ActionCounter, Status::Update(Value::ActionCounter(3))),
                (Key::LuckyFund, Status::Delete),
            ])
            .await
            .unwrap();
        assert_eq!(
            state.get(&Key::ActionCounter).await.unwrap(),
            Some(Value::ActionCounter(3))
        );

        state
            .apply(vec![(Key::ActionCounter, Status::Delete)])
            .await
            .unwrap();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn nonce_defaults_to_zero_and_increments() {
        let state = Memory::default();
        let public = PrivateKey::from_seed(1).public_key();
        let mut account = load_account(&state, &public).await.unwrap();
        assert_eq!(account.nonce, 0);

        assert!(matches!(
            validate_and_increment_nonce(&mut account, 1),
            Err(PrepareError::NonceMismatch {
                expected: 0,
                got: 1
            })
        ));
        validate_and_increment_nonce(&mut account, 0).unwrap();
        assert_eq!(account.nonce, 1);
    }
}

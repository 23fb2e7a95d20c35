use std::future::Future;

use rand::Rng;
use tracing::debug;

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Two uppercase letters followed by five digits, e.g. `QX48213`.
pub fn generate_order_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut id = String::with_capacity(7);
    for _ in 0..2 {
        id.push(LETTERS[rng.gen_range(0..LETTERS.len())] as char);
    }
    for _ in 0..5 {
        id.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    id
}

pub fn is_order_id(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == 7
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..].iter().all(u8::is_ascii_digit)
}

/// Generate ids until `exists` reports one as unused. There is no retry cap;
/// the id space is large enough that collisions stay rare.
pub async fn allocate_order_id<F, Fut, E>(mut exists: F) -> Result<String, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    loop {
        let candidate = generate_order_id(&mut rand::thread_rng());
        if !exists(candidate.clone()).await? {
            return Ok(candidate);
        }
        debug!(candidate = %candidate, "Order id collision, regenerating");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn generated_ids_match_pattern() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            let id = generate_order_id(&mut rng);
            assert!(is_order_id(&id), "bad id {id}");
        }
        assert!(!is_order_id("ab12345"));
        assert!(!is_order_id("AB1234"));
    }

    #[tokio::test]
    async fn ten_thousand_allocations_are_unique() {
        let mut taken = HashSet::new();

        for _ in 0..10_000 {
            let id = allocate_order_id(|candidate| {
                let exists = taken.contains(&candidate);
                async move { Ok::<_, ()>(exists) }
            })
            .await
            .unwrap();
            assert!(taken.insert(id));
        }

        assert_eq!(taken.len(), 10_000);
    }

    #[tokio::test]
    async fn collision_triggers_regeneration() {
        let mut calls = 0;

        let id = allocate_order_id(|_| {
            calls += 1;
            let exists = calls < 3;
            async move { Ok::<_, ()>(exists) }
        })
        .await
        .unwrap();

        assert_eq!(calls, 3);
        assert!(is_order_id(&id));
    }

    #[tokio::test]
    async fn lookup_failure_propagates() {
        let result = allocate_order_id(|_| async { Err::<bool, _>("store offline") }).await;

        assert_eq!(result, Err("store offline"));
    }
}

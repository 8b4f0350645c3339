use bcrypt::BcryptResult;

/// One-way password hashing with a fixed bcrypt cost.
#[derive(Clone, Copy, Debug)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        PasswordHasher { cost }
    }

    pub fn hash(&self, password: &str) -> BcryptResult<String> {
        bcrypt::hash(password, self.cost)
    }

    pub fn verify(&self, password: &str, hash: &str) -> BcryptResult<bool> {
        bcrypt::verify(password, hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_not_the_plaintext_and_verifies() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("pw").unwrap();
        assert_ne!(hash, "pw");
        assert!(hasher.verify("pw", &hash).unwrap());
        assert!(!hasher.verify("other", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = PasswordHasher::new(4);
        assert_ne!(hasher.hash("pw").unwrap(), hasher.hash("pw").unwrap());
    }
}

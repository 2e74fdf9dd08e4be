//! Types dealing with data identity.

macro_rules! imp_deref {
    ($i:ty, $t:ty) => {
        impl std::ops::Deref for $i {
            type Target = $t;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

macro_rules! imp_from {
    ($a:ty, $b:ty, $i:ident => $e:expr) => {
        impl From<$b> for $a {
            fn from($i: $b) -> Self {
                $e
            }
        }
    };
}

/// The base64 rendering makes debugging much easier than rust's
/// default of a decimal byte array.
fn display(
    b: &bytes::Bytes,
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    use base64::prelude::*;
    f.write_str(&BASE64_URL_SAFE_NO_PAD.encode(b))
}

/// Base data identity type meant for newtyping.
/// You probably want [CoValueId], [PeerId] or [SessionId].
///
/// These bytes should ONLY be the actual identity bytes being tracked,
/// without prefix or suffix.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct Id(#[serde(with = "crate::serde_bytes_base64")] pub bytes::Bytes);

imp_deref!(Id, bytes::Bytes);
imp_from!(Id, bytes::Bytes, b => Id(b));

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display(&self.0, f)
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display(&self.0, f)
    }
}

/// Identifies one replicated object (a "CoValue") in the store.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct CoValueId(pub Id);

imp_deref!(CoValueId, Id);
imp_from!(CoValueId, bytes::Bytes, b => CoValueId(Id(b)));
imp_from!(CoValueId, Id, b => CoValueId(b));

impl std::fmt::Display for CoValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display(&self.0 .0, f)
    }
}

impl std::fmt::Debug for CoValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display(&self.0 .0, f)
    }
}

/// Identifies one peer connection.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct PeerId(pub Id);

imp_deref!(PeerId, Id);
imp_from!(PeerId, bytes::Bytes, b => PeerId(Id(b)));
imp_from!(PeerId, Id, b => PeerId(b));

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display(&self.0 .0, f)
    }
}

impl std::fmt::Debug for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display(&self.0 .0, f)
    }
}

/// Identifies one append-only per-author session log contributing to an
/// object's content.
#[derive(
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(pub Id);

imp_deref!(SessionId, Id);
imp_from!(SessionId, bytes::Bytes, b => SessionId(Id(b)));
imp_from!(SessionId, Id, b => SessionId(b));

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display(&self.0 .0, f)
    }
}

impl std::fmt::Debug for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        display(&self.0 .0, f)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn id_serde_fixtures() {
        const F: &[(&[u8], &str)] = &[
            (b"co_test123", "\"Y29fdGVzdDEyMw\""),
            (b"s", "\"cw\""),
            (&[255, 255, 255, 255, 255, 255, 255], "\"_________w\""),
        ];

        for (d, e) in F.iter() {
            let r = serde_json::to_string(&Id(bytes::Bytes::from_static(d)))
                .unwrap();
            assert_eq!(e, &r);
            let r: CoValueId = serde_json::from_str(e).unwrap();
            assert_eq!(d, &r.0 .0);
        }
    }

    #[test]
    fn display_is_base64() {
        let id = PeerId::from(bytes::Bytes::from_static(b"peer1"));
        assert_eq!("cGVlcjE", id.to_string());
        assert_eq!("cGVlcjE", format!("{id:?}"));
    }
}

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::codec::{self, ScanError, Scanner};
use crate::core::system::Member;
use crate::core::ActionType;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoError {
    #[error("payload too short")]
    TooShort,
    #[error("no member signature matched")]
    Unauthenticated,
    #[error("payload decryption failed")]
    Decrypt,
    #[error("unknown action type {0}")]
    UnknownAction(u8),
    #[error(transparent)]
    Scan(#[from] ScanError),
}

/// A decrypted user action: `reserve_user || follow || action || payload`.
#[derive(Debug, Clone)]
pub struct UserAction {
    /// Fallback user id when the output carries no resolved sender.
    pub reserve_user_id: Uuid,
    /// Client-side correlation id echoed back in response memos.
    pub follow_id: Uuid,
    pub action: ActionType,
    pub body: Vec<u8>,
}

/// An authenticated member action: `trace || action || payload`, signed by
/// one of the governance members.
#[derive(Debug, Clone)]
pub struct MemberAction {
    pub member_id: String,
    pub trace_id: Uuid,
    pub action: ActionType,
    pub body: Vec<u8>,
}

/// Encrypt a user action payload under the system key. Layout of the sealed
/// blob is `nonce(12) || AES-256-GCM ciphertext`.
pub fn seal_user_action(
    key: &[u8; 32],
    reserve_user_id: Uuid,
    follow_id: Uuid,
    action: ActionType,
    payload: &[u8],
) -> Result<Vec<u8>, MemoError> {
    let mut plain = Vec::with_capacity(33 + payload.len());
    codec::put_uuid(&mut plain, &reserve_user_id);
    codec::put_uuid(&mut plain, &follow_id);
    codec::put_u8(&mut plain, action as u8);
    plain.extend_from_slice(payload);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(&Uuid::new_v4().as_bytes()[..NONCE_LEN]);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let sealed = cipher
        .encrypt(nonce, plain.as_slice())
        .map_err(|_| MemoError::Decrypt)?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&sealed);
    Ok(out)
}

/// Open and scan a sealed user action.
pub fn decode_user_action(key: &[u8; 32], raw: &[u8]) -> Result<UserAction, MemoError> {
    if raw.len() <= NONCE_LEN {
        return Err(MemoError::TooShort);
    }
    let (nonce, sealed) = raw.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let plain = cipher
        .decrypt(Nonce::from_slice(nonce), sealed)
        .map_err(|_| MemoError::Decrypt)?;

    let mut s = Scanner::new(&plain);
    let reserve_user_id = s.read_uuid()?;
    let follow_id = s.read_uuid()?;
    let raw_action = s.read_u8()?;
    let action = ActionType::from_u8(raw_action).ok_or(MemoError::UnknownAction(raw_action))?;
    let body = plain[plain.len() - s.remaining()..].to_vec();

    Ok(UserAction {
        reserve_user_id,
        follow_id,
        action,
        body,
    })
}

/// Sign a member action with the member's key: `body || HMAC-SHA256(body)`
/// where `body = trace || action || payload`.
pub fn sign_member_action(
    member_key: &[u8],
    trace_id: Uuid,
    action: ActionType,
    payload: &[u8],
) -> Vec<u8> {
    let mut body = Vec::with_capacity(17 + payload.len());
    codec::put_uuid(&mut body, &trace_id);
    codec::put_u8(&mut body, action as u8);
    body.extend_from_slice(payload);

    let mut mac = <HmacSha256 as Mac>::new_from_slice(member_key).expect("hmac accepts any key length");
    mac.update(&body);
    let tag = mac.finalize().into_bytes();

    body.extend_from_slice(&tag);
    body
}

/// Authenticate a member action by iterating the member set and verifying
/// the trailing tag in constant time.
pub fn decode_member_action(raw: &[u8], members: &[Member]) -> Result<MemberAction, MemoError> {
    if raw.len() <= TAG_LEN {
        return Err(MemoError::TooShort);
    }
    let (body, tag) = raw.split_at(raw.len() - TAG_LEN);

    let member = members
        .iter()
        .find(|m| {
            let mut mac = match <HmacSha256 as Mac>::new_from_slice(&m.key) {
                Ok(mac) => mac,
                Err(_) => return false,
            };
            mac.update(body);
            mac.verify_slice(tag).is_ok()
        })
        .ok_or(MemoError::Unauthenticated)?;

    let mut s = Scanner::new(body);
    let trace_id = s.read_uuid()?;
    let raw_action = s.read_u8()?;
    let action = ActionType::from_u8(raw_action).ok_or(MemoError::UnknownAction(raw_action))?;
    let payload = body[body.len() - s.remaining()..].to_vec();

    Ok(MemberAction {
        member_id: member.id.clone(),
        trace_id,
        action,
        body: payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<Member> {
        vec![
            Member {
                id: "m1".to_string(),
                key: b"member-one-key".to_vec(),
            },
            Member {
                id: "m2".to_string(),
                key: b"member-two-key".to_vec(),
            },
        ]
    }

    #[test]
    fn user_action_seal_open_round_trip() {
        let key = [7u8; 32];
        let reserve = Uuid::new_v4();
        let follow = Uuid::new_v4();
        let sealed =
            seal_user_action(&key, reserve, follow, ActionType::Borrow, b"payload").unwrap();

        let action = decode_user_action(&key, &sealed).unwrap();
        assert_eq!(action.reserve_user_id, reserve);
        assert_eq!(action.follow_id, follow);
        assert_eq!(action.action, ActionType::Borrow);
        assert_eq!(action.body, b"payload");
    }

    #[test]
    fn user_action_wrong_key_fails() {
        let sealed = seal_user_action(
            &[7u8; 32],
            Uuid::new_v4(),
            Uuid::new_v4(),
            ActionType::Supply,
            &[],
        )
        .unwrap();
        assert!(matches!(
            decode_user_action(&[8u8; 32], &sealed),
            Err(MemoError::Decrypt)
        ));
    }

    #[test]
    fn member_action_identifies_signer() {
        let members = members();
        let trace = Uuid::new_v4();
        let raw = sign_member_action(&members[1].key, trace, ActionType::ProposalVote, &[]);

        let action = decode_member_action(&raw, &members).unwrap();
        assert_eq!(action.member_id, "m2");
        assert_eq!(action.trace_id, trace);
        assert_eq!(action.action, ActionType::ProposalVote);
        assert!(action.body.is_empty());
    }

    #[test]
    fn member_action_rejects_foreign_key() {
        let members = members();
        let raw = sign_member_action(
            b"not-a-member",
            Uuid::new_v4(),
            ActionType::ProposalVote,
            &[],
        );
        assert!(matches!(
            decode_member_action(&raw, &members),
            Err(MemoError::Unauthenticated)
        ));
    }

    #[test]
    fn tampered_member_body_rejected() {
        let members = members();
        let mut raw = sign_member_action(
            &members[0].key,
            Uuid::new_v4(),
            ActionType::ProposalVote,
            &[],
        );
        raw[0] ^= 0xff;
        assert!(matches!(
            decode_member_action(&raw, &members),
            Err(MemoError::Unauthenticated)
        ));
    }
}

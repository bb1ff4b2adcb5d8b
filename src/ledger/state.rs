use std::collections::HashMap;

use crate::address::Address;

use super::{
    error::LedgerError,
    types::{
        valid_content, valid_username, ConversationKey, DirectMessage, LedgerEvent, LedgerPolicy,
        Message, SameNamePolicy, UserProfile, Write,
    },
};

/// The whole ledger as one owned aggregate.
///
/// Writes are two-phase: [`LedgerState::plan`] validates a [`Write`] against the
/// current state and produces the event it would commit, without touching
/// anything; [`LedgerState::apply`] then folds that event in. A rejected plan
/// leaves the aggregate exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct LedgerState {
    policy: LedgerPolicy,

    profiles: HashMap<Address, UserProfile>,
    usernames: HashMap<String, Address>,
    registered: Vec<Address>,

    messages: Vec<Message>,

    conversations: HashMap<ConversationKey, Vec<DirectMessage>>,
    partners: HashMap<Address, Vec<Address>>,
}

impl LedgerState {
    pub fn new(policy: LedgerPolicy) -> Self {
        Self {
            policy,
            ..Default::default()
        }
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    pub fn plan(&self, write: &Write, now: i64) -> Result<LedgerEvent, LedgerError> {
        match write {
            Write::Register { address, username, avatar_ref } => {
                if self.profiles.contains_key(address) {
                    return Err(LedgerError::DuplicateIdentity(*address));
                }
                if !valid_username(username) {
                    return Err(LedgerError::UsernameInvalid);
                }
                if self.usernames.contains_key(username) {
                    return Err(LedgerError::UsernameTaken(username.clone()));
                }

                Ok(LedgerEvent::UserRegistered {
                    address: *address,
                    username: username.clone(),
                    avatar_ref: avatar_ref.clone(),
                    timestamp: now,
                })
            }

            Write::ChangeUsername { address, username } => {
                let profile = self.registered_profile(address)?;
                if !valid_username(username) {
                    return Err(LedgerError::UsernameInvalid);
                }
                match self.usernames.get(username) {
                    Some(owner) if owner != address => {
                        return Err(LedgerError::UsernameTaken(username.clone()));
                    }
                    Some(_) if self.policy.same_name == SameNamePolicy::Reject => {
                        return Err(LedgerError::UsernameTaken(username.clone()));
                    }
                    _ => {}
                }

                Ok(LedgerEvent::UsernameChanged {
                    address: *address,
                    old_username: profile.username.clone(),
                    new_username: username.clone(),
                })
            }

            Write::UpdateAvatar { address, avatar_ref } => {
                self.registered_profile(address)?;
                Ok(LedgerEvent::AvatarUpdated {
                    address: *address,
                    avatar_ref: avatar_ref.clone(),
                })
            }

            Write::PostMessage { sender, content } => {
                self.registered_profile(sender)?;
                if !valid_content(content) {
                    return Err(LedgerError::ContentInvalid);
                }

                Ok(LedgerEvent::MessagePosted {
                    sender: *sender,
                    content: content.clone(),
                    timestamp: now,
                    id: self.messages.len() as u64,
                })
            }

            Write::PostDirectMessage { sender, receiver, content } => {
                self.registered_profile(sender)?;
                if !self.is_registered(receiver) {
                    return Err(LedgerError::UnknownCounterpart(*receiver));
                }
                if sender == receiver && !self.policy.allow_self_messages {
                    return Err(LedgerError::SelfMessage);
                }
                if !valid_content(content) {
                    return Err(LedgerError::ContentInvalid);
                }

                Ok(LedgerEvent::DirectMessageSent {
                    sender: *sender,
                    receiver: *receiver,
                    content: content.clone(),
                    timestamp: now,
                })
            }

            Write::MarkConversationRead { reader, counterpart } => {
                self.registered_profile(reader)?;
                let count = self
                    .conversation(reader, counterpart)
                    .iter()
                    .filter(|dm| dm.receiver == *reader && !dm.is_read)
                    .count();

                Ok(LedgerEvent::ConversationRead {
                    reader: *reader,
                    counterpart: *counterpart,
                    count,
                })
            }
        }
    }

    /// Folds a planned event into the aggregate. Only call with events produced
    /// by [`LedgerState::plan`] on this same state.
    pub fn apply(&mut self, event: &LedgerEvent) {
        match event {
            LedgerEvent::UserRegistered { address, username, avatar_ref, timestamp } => {
                self.restore_profile(UserProfile {
                    address: *address,
                    username: username.clone(),
                    avatar_ref: avatar_ref.clone(),
                    is_registered: true,
                    registered_at: *timestamp,
                    messages_sent: 0,
                });
            }

            LedgerEvent::UsernameChanged { address, old_username, new_username } => {
                self.usernames.remove(old_username);
                self.usernames.insert(new_username.clone(), *address);
                if let Some(profile) = self.profiles.get_mut(address) {
                    profile.username = new_username.clone();
                }
            }

            LedgerEvent::AvatarUpdated { address, avatar_ref } => {
                if let Some(profile) = self.profiles.get_mut(address) {
                    profile.avatar_ref = avatar_ref.clone();
                }
            }

            LedgerEvent::MessagePosted { sender, content, timestamp, id } => {
                self.messages.push(Message {
                    id: *id,
                    sender: *sender,
                    content: content.clone(),
                    timestamp: *timestamp,
                });
                if let Some(profile) = self.profiles.get_mut(sender) {
                    profile.messages_sent += 1;
                }
            }

            LedgerEvent::DirectMessageSent { sender, receiver, content, timestamp } => {
                let thread = self
                    .conversations
                    .entry(ConversationKey::between(sender, receiver))
                    .or_default();
                let first = thread.is_empty();
                thread.push(DirectMessage {
                    sender: *sender,
                    receiver: *receiver,
                    content: content.clone(),
                    timestamp: *timestamp,
                    is_read: false,
                });

                if first {
                    self.restore_partner(*sender, *receiver);
                    self.restore_partner(*receiver, *sender);
                }
            }

            LedgerEvent::ConversationRead { reader, counterpart, .. } => {
                let key = ConversationKey::between(reader, counterpart);
                if let Some(thread) = self.conversations.get_mut(&key) {
                    thread
                        .iter_mut()
                        .filter(|dm| dm.receiver == *reader)
                        .for_each(|dm| dm.is_read = true);
                }
            }
        }
    }

    pub(crate) fn restore_profile(&mut self, profile: UserProfile) {
        self.usernames.insert(profile.username.clone(), profile.address);
        self.registered.push(profile.address);
        self.profiles.insert(profile.address, profile);
    }

    pub(crate) fn restore_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn restore_direct_message(&mut self, dm: DirectMessage) {
        self.conversations
            .entry(ConversationKey::between(&dm.sender, &dm.receiver))
            .or_default()
            .push(dm);
    }

    /// Appends `partner` to `address`'s conversation index unless already present.
    pub(crate) fn restore_partner(&mut self, address: Address, partner: Address) {
        let list = self.partners.entry(address).or_default();
        if !list.contains(&partner) {
            list.push(partner);
        }
    }

    fn registered_profile(&self, address: &Address) -> Result<&UserProfile, LedgerError> {
        self.profiles
            .get(address)
            .filter(|profile| profile.is_registered)
            .ok_or(LedgerError::NotRegistered(*address))
    }

    pub fn is_registered(&self, address: &Address) -> bool {
        self.profiles
            .get(address)
            .is_some_and(|profile| profile.is_registered)
    }

    pub fn is_username_available(&self, username: &str) -> bool {
        !self.usernames.contains_key(username)
    }

    pub fn resolve_username(&self, username: &str) -> Option<Address> {
        self.usernames.get(username).copied()
    }

    pub fn profile(&self, address: &Address) -> Option<&UserProfile> {
        self.profiles.get(address)
    }

    pub fn registered_addresses(&self) -> &[Address] {
        &self.registered
    }

    pub fn general_messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn recent_messages(&self, limit: usize) -> &[Message] {
        &self.messages[self.messages.len().saturating_sub(limit)..]
    }

    pub fn conversation(&self, a: &Address, b: &Address) -> &[DirectMessage] {
        self.conversations
            .get(&ConversationKey::between(a, b))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn conversation_partners(&self, address: &Address) -> &[Address] {
        self.partners
            .get(address)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn user_count(&self) -> usize {
        self.registered.len()
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

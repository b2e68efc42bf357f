use crate::error::TokenPoolError;
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    program_error::ProgramError,
    program_pack::{Pack, Sealed},
    pubkey::Pubkey,
};
use static_assertions::const_assert_eq;
use std::io::{self, Read, Write};

#[repr(u8)]
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AccountType {
    #[default]
    Uninitialized,
    Member,
}

impl TryFrom<u8> for AccountType {
    type Error = TokenPoolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Uninitialized),
            1 => Ok(Self::Member),
            _ => Err(TokenPoolError::InvalidRecordData),
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShareStage {
    #[default]
    Uninitialized,
    Held,
    Escrowed,
}

impl TryFrom<u8> for ShareStage {
    type Error = TokenPoolError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::Uninitialized),
            1 => Ok(Self::Held),
            2 => Ok(Self::Escrowed),
            _ => Err(TokenPoolError::InvalidRecordData),
        }
    }
}

/// One fixed position in the pool's member arena.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MemberSlot {
    pub account_type: AccountType,
    /// The participant, or the share escrow vault while a sale is open.
    pub member_key: Pubkey,
    pub amount_deposited: u64,
    /// Ownership in percentage points.
    pub share: f64,
    pub share_stage: ShareStage,
    /// Open escrow record, `Pubkey::default()` when none.
    pub escrow: Pubkey,
}

impl MemberSlot {
    pub fn held(member_key: Pubkey, amount_deposited: u64, share: f64) -> Self {
        Self {
            account_type: AccountType::Member,
            member_key,
            amount_deposited,
            share,
            share_stage: ShareStage::Held,
            escrow: Pubkey::default(),
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.account_type == AccountType::Member
    }

    pub fn is_escrowed(&self) -> bool {
        self.share_stage == ShareStage::Escrowed
    }

    pub fn release(&mut self) {
        *self = Self::default();
    }
}

impl Sealed for MemberSlot {}

impl Pack for MemberSlot {
    const LEN: usize = 1 + 32 + 8 + 8 + 1 + 32;

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, MemberSlot::LEN];
        let (account_type, member_key, amount_deposited, share, share_stage, escrow) =
            mut_array_refs![dst, 1, 32, 8, 8, 1, 32];
        account_type[0] = self.account_type as u8;
        member_key.copy_from_slice(self.member_key.as_ref());
        *amount_deposited = self.amount_deposited.to_le_bytes();
        *share = self.share.to_le_bytes();
        share_stage[0] = self.share_stage as u8;
        escrow.copy_from_slice(self.escrow.as_ref());
    }

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        if src.len() != MemberSlot::LEN {
            return Err(TokenPoolError::InvalidRecordData.into());
        }
        let src = array_ref![src, 0, MemberSlot::LEN];
        let (account_type, member_key, amount_deposited, share, share_stage, escrow) =
            array_refs![src, 1, 32, 8, 8, 1, 32];
        let share = f64::from_le_bytes(*share);
        if share.is_nan() {
            return Err(TokenPoolError::InvalidRecordData.into());
        }
        Ok(Self {
            account_type: AccountType::try_from(account_type[0])?,
            member_key: Pubkey::new_from_array(*member_key),
            amount_deposited: u64::from_le_bytes(*amount_deposited),
            share,
            share_stage: ShareStage::try_from(share_stage[0])?,
            escrow: Pubkey::new_from_array(*escrow),
        })
    }
}

const_assert_eq!(MemberSlot::LEN, 82);

#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, Default, PartialEq)]
pub struct MemberListHeader {
    pub account_type: AccountType,
    pub max_members: u32,
}

impl MemberListHeader {
    pub const LEN: usize = 1 + 4;
}

/// Fixed-capacity arena of member slots. Its length never changes after creation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemberList {
    pub header: MemberListHeader,
    pub members: Vec<MemberSlot>,
}

impl MemberList {
    pub fn with_capacity(max_members: u32) -> Self {
        Self {
            header: MemberListHeader {
                account_type: AccountType::Member,
                max_members,
            },
            members: vec![MemberSlot::default(); max_members as usize],
        }
    }

    pub fn space(max_members: u32) -> usize {
        MemberListHeader::LEN + MemberSlot::LEN * max_members as usize
    }

    pub fn first_free(&self) -> Option<usize> {
        self.members.iter().position(|slot| !slot.is_occupied())
    }

    pub fn free_slots(&self) -> usize {
        self.members.iter().filter(|slot| !slot.is_occupied()).count()
    }

    pub fn position_of(&self, member_key: &Pubkey) -> Option<usize> {
        self.members
            .iter()
            .position(|slot| slot.is_occupied() && slot.member_key == *member_key)
    }

    pub fn position_of_escrow(&self, escrow: &Pubkey) -> Option<usize> {
        self.members
            .iter()
            .position(|slot| slot.is_escrowed() && slot.escrow == *escrow)
    }

    /// Escrowed slots are keyed by their share escrow vault.
    pub fn position_of_escrow_vault(&self, escrow_vault: &Pubkey) -> Option<usize> {
        self.members
            .iter()
            .position(|slot| slot.is_escrowed() && slot.member_key == *escrow_vault)
    }

    pub fn occupied(&self) -> impl Iterator<Item = &MemberSlot> {
        self.members.iter().filter(|slot| slot.is_occupied())
    }
}

impl BorshSerialize for MemberList {
    fn serialize<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        if self.members.len() != self.header.max_members as usize {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "member list length differs from its capacity",
            ));
        }
        self.header.serialize(writer)?;
        let mut buf = [0u8; MemberSlot::LEN];
        for slot in &self.members {
            slot.pack_into_slice(&mut buf);
            writer.write_all(&buf)?;
        }
        Ok(())
    }
}

impl BorshDeserialize for MemberList {
    fn deserialize_reader<R: Read>(reader: &mut R) -> io::Result<Self> {
        let header = MemberListHeader::deserialize_reader(reader)?;
        let mut members = Vec::new();
        let mut buf = [0u8; MemberSlot::LEN];
        for _ in 0..header.max_members {
            reader.read_exact(&mut buf)?;
            let slot = MemberSlot::unpack_from_slice(&buf)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "invalid member slot"))?;
            members.push(slot);
        }
        Ok(Self { header, members })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_layout_offsets() {
        let member = Pubkey::new_unique();
        let escrow = Pubkey::new_unique();
        let slot = MemberSlot {
            account_type: AccountType::Member,
            member_key: member,
            amount_deposited: 7,
            share: 20.0,
            share_stage: ShareStage::Escrowed,
            escrow,
        };
        let mut buf = [0u8; MemberSlot::LEN];
        slot.pack_into_slice(&mut buf);

        assert_eq!(buf[0], 1);
        assert_eq!(&buf[1..33], member.as_ref());
        assert_eq!(&buf[33..41], &7u64.to_le_bytes());
        assert_eq!(&buf[41..49], &20f64.to_le_bytes());
        assert_eq!(buf[49], 2);
        assert_eq!(&buf[50..82], escrow.as_ref());
        assert_eq!(MemberSlot::unpack_from_slice(&buf).unwrap(), slot);
    }

    #[test]
    fn test_slot_rejects_unknown_tags() {
        let mut buf = [0u8; MemberSlot::LEN];
        buf[0] = 9;
        assert!(MemberSlot::unpack_from_slice(&buf).is_err());

        let mut buf = [0u8; MemberSlot::LEN];
        buf[49] = 3;
        assert!(MemberSlot::unpack_from_slice(&buf).is_err());
    }

    #[test]
    fn test_slot_rejects_short_buffer() {
        assert!(MemberSlot::unpack_from_slice(&[0u8; MemberSlot::LEN - 1]).is_err());
    }

    #[test]
    fn test_member_list_has_fixed_length() {
        let list = MemberList::with_capacity(4);
        let bytes = list.try_to_vec().unwrap();
        assert_eq!(bytes.len(), MemberList::space(4));
        assert_eq!(&bytes[1..5], &4u32.to_le_bytes());

        let decoded = MemberList::try_from_slice(&bytes).unwrap();
        assert_eq!(decoded.members.len(), 4);
        assert_eq!(decoded, list);
    }

    #[test]
    fn test_member_list_refuses_resized_arena() {
        let mut list = MemberList::with_capacity(2);
        list.members.push(MemberSlot::default());
        assert!(list.try_to_vec().is_err());
    }

    #[test]
    fn test_member_list_truncated_fails() {
        let bytes = MemberList::with_capacity(3).try_to_vec().unwrap();
        assert!(MemberList::try_from_slice(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_free_slot_lookup() {
        let mut list = MemberList::with_capacity(3);
        let alice = Pubkey::new_unique();
        list.members[0] = MemberSlot::held(alice, 1, 10.0);
        assert_eq!(list.first_free(), Some(1));
        assert_eq!(list.free_slots(), 2);
        assert_eq!(list.position_of(&alice), Some(0));

        list.members[0].release();
        assert_eq!(list.first_free(), Some(0));
        assert_eq!(list.position_of(&alice), None);
    }
}

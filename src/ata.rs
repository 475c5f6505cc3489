//! ATA PASS-THROUGH(16) encoding and sense-buffer decoding.
//!
//! Only what the read test needs: a non-data 48-bit command, the sense key,
//! and the ATA status/error registers the device hands back in either
//! descriptor-format or fixed-format sense data when a command fails.
//!
//! CK_COND stays clear. With it set, libata reports every successful command
//! as RECOVERED ERROR (ASC/ASCQ 00h/1Dh) just to carry the registers back.

/// SCSI opcode for ATA PASS-THROUGH(16).
pub const ATA_PASS_THROUGH_16: u8 = 0x85;
/// READ VERIFY SECTORS EXT.
pub const ATA_READ_VERIFY_EXT: u8 = 0x42;

pub const CDB_LEN: usize = 16;
pub const SENSE_LEN: usize = 32;

/// SAT protocol field value for non-data commands.
const PROTOCOL_NON_DATA: u8 = 3;
/// Device register: LBA addressing.
const DEVICE_LBA: u8 = 0x40;

/// Sense key for ABORTED COMMAND.
pub const SENSE_KEY_ABORTED_COMMAND: u8 = 0x0B;

const ATA_RETURN_DESCRIPTOR: u8 = 0x09;

/// ATA status register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtaStatus(pub u8);

impl AtaStatus {
    pub const ERR: u8 = 0x01;
    pub const DF: u8 = 0x20;
    pub const DRDY: u8 = 0x40;
    pub const BSY: u8 = 0x80;

    pub fn err(self) -> bool {
        self.0 & Self::ERR != 0
    }

    pub fn device_fault(self) -> bool {
        self.0 & Self::DF != 0
    }
}

/// ATA error register.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtaError(pub u8);

impl AtaError {
    pub const ABRT: u8 = 0x04;
    pub const IDNF: u8 = 0x10;
    pub const UNC: u8 = 0x40;

    pub fn uncorrectable(self) -> bool {
        self.0 & Self::UNC != 0
    }

    pub fn id_not_found(self) -> bool {
        self.0 & Self::IDNF != 0
    }

    pub fn aborted(self) -> bool {
        self.0 & Self::ABRT != 0
    }
}

/// Registers returned by the device after a passthrough command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AtaReturn {
    pub error: AtaError,
    pub status: AtaStatus,
}

/// Build the CDB for a 48-bit non-data ATA command.
pub fn verify_ext_cdb(lba: u64, sectors: u16) -> [u8; CDB_LEN] {
    ata_cdb(ATA_READ_VERIFY_EXT, lba, sectors)
}

pub fn ata_cdb(command: u8, lba: u64, count: u16) -> [u8; CDB_LEN] {
    let mut cdb = [0u8; CDB_LEN];
    let l = lba.to_be_bytes();
    cdb[0] = ATA_PASS_THROUGH_16;
    cdb[1] = (PROTOCOL_NON_DATA << 1) | 0x01; // extend
    cdb[2] = 0; // no transfer, CK_COND clear
    let [count_hi, count_lo] = count.to_be_bytes();
    cdb[5] = count_hi;
    cdb[6] = count_lo;
    // LBA bits 24..31, 0..7, 32..39, 8..15, 40..47, 16..23
    cdb[7] = l[4];
    cdb[8] = l[7];
    cdb[9] = l[3];
    cdb[10] = l[6];
    cdb[11] = l[2];
    cdb[12] = l[5];
    cdb[13] = DEVICE_LBA;
    cdb[14] = command;
    cdb
}

/// Sense key from fixed or descriptor format sense data, 0 if there is none.
pub fn sense_key(sense: &[u8]) -> u8 {
    match sense.first().map(|b| b & 0x7f) {
        Some(0x72) | Some(0x73) => sense.get(1).map_or(0, |b| b & 0x0f),
        Some(0x70) | Some(0x71) => sense.get(2).map_or(0, |b| b & 0x0f),
        _ => 0,
    }
}

/// Pull the ATA registers out of the sense data, zeroed when absent.
pub fn ata_return(sense: &[u8]) -> AtaReturn {
    match sense.first().map(|b| b & 0x7f) {
        Some(0x72) | Some(0x73) => descriptor_return(sense).unwrap_or_default(),
        Some(0x70) | Some(0x71) if sense.len() > 4 => AtaReturn {
            error: AtaError(sense[3]),
            status: AtaStatus(sense[4]),
        },
        _ => AtaReturn::default(),
    }
}

fn descriptor_return(sense: &[u8]) -> Option<AtaReturn> {
    let additional = *sense.get(7)? as usize;
    let end = (8 + additional).min(sense.len());
    let mut off = 8;
    while off + 1 < end {
        let code = sense[off];
        let len = sense[off + 1] as usize;
        if code == ATA_RETURN_DESCRIPTOR {
            let desc = sense.get(off..off + 14)?;
            return Some(AtaReturn {
                error: AtaError(desc[3]),
                status: AtaStatus(desc[13]),
            });
        }
        off += 2 + len;
    }
    None
}

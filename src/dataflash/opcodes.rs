// AT45D command set; values are fixed by the chip.

pub const MAIN_MEMORY_PAGE_READ:          u8 = 0x52;
pub const PAGE_TO_BUFFER_1_TRANSFER:      u8 = 0x53;
pub const BUFFER_1_READ:                  u8 = 0x54;
pub const PAGE_TO_BUFFER_2_TRANSFER:      u8 = 0x55;
pub const BUFFER_2_READ:                  u8 = 0x56;
pub const STATUS_REGISTER_READ:           u8 = 0x57;
pub const AUTO_PAGE_REWRITE_BUFFER_1:     u8 = 0x58;
pub const AUTO_PAGE_REWRITE_BUFFER_2:     u8 = 0x59;
pub const PAGE_TO_BUFFER_1_COMPARE:       u8 = 0x60;
pub const PAGE_TO_BUFFER_2_COMPARE:       u8 = 0x61;
pub const CONTINUOUS_ARRAY_READ:          u8 = 0x68; // A/B-parts only
pub const PAGE_ERASE:                     u8 = 0x81;
pub const PAGE_PROGRAM_THROUGH_BUFFER_1:  u8 = 0x82;
pub const BUFFER_1_TO_PAGE_WITH_ERASE:    u8 = 0x83;
pub const BUFFER_1_WRITE:                 u8 = 0x84;
pub const PAGE_PROGRAM_THROUGH_BUFFER_2:  u8 = 0x85;
pub const BUFFER_2_TO_PAGE_WITH_ERASE:    u8 = 0x86;
pub const BUFFER_2_WRITE:                 u8 = 0x87;
pub const BUFFER_1_TO_PAGE_WITHOUT_ERASE: u8 = 0x88;
pub const BUFFER_2_TO_PAGE_WITHOUT_ERASE: u8 = 0x89;

// don't care bytes following the address in the read commands
pub const BUFFER_READ_DONT_CARE: usize = 1;
pub const ARRAY_READ_DONT_CARE: usize = 4;

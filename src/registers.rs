//! MPU-9250 and AK8963 register map
//!
//! Register Map RM-MPU-9250A-00 and the AK8963 datasheet. Only the registers
//! and values the driver touches are listed.

// ============================================================================
// Bus addresses
// ============================================================================

/// MPU-9250 address with AD0 low
pub const MPU9250_ADDR: u8 = 0x68;

/// MPU-9250 address with AD0 high
pub const MPU9250_ADDR_ALT: u8 = 0x69;

/// AK8963 address, reachable once the MPU-9250 I2C bypass is enabled
pub const AK8963_ADDR: u8 = 0x0C;

// ============================================================================
// MPU-9250 registers
// ============================================================================

pub const SELF_TEST_X_GYRO: u8 = 0x00;
pub const SELF_TEST_Y_GYRO: u8 = 0x01;
pub const SELF_TEST_Z_GYRO: u8 = 0x02;

pub const SELF_TEST_X_ACCEL: u8 = 0x0D;
pub const SELF_TEST_Y_ACCEL: u8 = 0x0E;
pub const SELF_TEST_Z_ACCEL: u8 = 0x0F;

/// Gyroscope offset words, high byte first, 32.8 LSB/deg/s
pub const XG_OFFSET_H: u8 = 0x13;

/// Sample rate = internal rate / (1 + SMPLRT_DIV)
pub const SMPLRT_DIV: u8 = 0x19;
/// DLPF and FSYNC
pub const CONFIG: u8 = 0x1A;
pub const GYRO_CONFIG: u8 = 0x1B;
pub const ACCEL_CONFIG: u8 = 0x1C;
pub const ACCEL_CONFIG_2: u8 = 0x1D;

pub const FIFO_EN: u8 = 0x23;
pub const I2C_MST_CTRL: u8 = 0x24;
pub const INT_PIN_CFG: u8 = 0x37;
pub const INT_ENABLE: u8 = 0x38;
pub const INT_STATUS: u8 = 0x3A;

/// Start of the 14-byte accel / temperature / gyro block, big-endian
pub const ACCEL_XOUT_H: u8 = 0x3B;
pub const TEMP_OUT_H: u8 = 0x41;
pub const GYRO_XOUT_H: u8 = 0x43;

pub const USER_CTRL: u8 = 0x6A;
pub const PWR_MGMT_1: u8 = 0x6B;
pub const PWR_MGMT_2: u8 = 0x6C;
pub const FIFO_COUNTH: u8 = 0x72;
pub const FIFO_R_W: u8 = 0x74;
pub const WHO_AM_I: u8 = 0x75;

/// Accelerometer offset words, bit 0 of the low byte is reserved
pub const XA_OFFSET_H: u8 = 0x77;
pub const YA_OFFSET_H: u8 = 0x7A;
pub const ZA_OFFSET_H: u8 = 0x7D;

// ============================================================================
// MPU-9250 register values
// ============================================================================

pub const MPU9250_WHO_AM_I_VALUE: u8 = 0x71;

pub const PWR_MGMT_1_H_RESET: u8 = 0x80;
pub const PWR_MGMT_1_CLKSEL_AUTO: u8 = 0x01;
/// Sleep with the cycle and standby bits set
pub const PWR_MGMT_1_STANDBY: u8 = 0x3F;
pub const PWR_MGMT_1_SLEEP_CYCLE: u8 = 0x48;

/// Gyro DLPF 41 Hz, 1 kHz internal rate
pub const DLPF_CFG_41HZ: u8 = 0x03;
/// Gyro DLPF 184 Hz, used while filling the FIFO
pub const DLPF_CFG_184HZ: u8 = 0x01;
/// Gyro DLPF 92 Hz, used for self-test
pub const DLPF_CFG_92HZ: u8 = 0x02;
/// 1 kHz / (1 + 4) = 200 Hz
pub const SMPLRT_DIV_200HZ: u8 = 0x04;

/// Full-scale bits live in [4:3], Fchoice_b in [1:0]
pub const FS_SEL_MASK: u8 = 0x18;
pub const FCHOICE_B_MASK: u8 = 0x03;
pub const FS_SEL_SHIFT: u8 = 3;

/// Accel DLPF bits in ACCEL_CONFIG_2 [3:0]
pub const ACCEL_DLPF_MASK: u8 = 0x0F;
pub const ACCEL_DLPF_41HZ: u8 = 0x03;
pub const ACCEL_DLPF_92HZ: u8 = 0x02;

/// Self-test enable on all three axes
pub const SELF_TEST_ENABLE: u8 = 0xE0;

/// INT pin latched, cleared on any read, I2C bypass enabled
pub const INT_PIN_CFG_LATCH_BYPASS: u8 = 0x12;
pub const INT_RAW_RDY_EN: u8 = 0x01;
pub const INT_STATUS_RAW_DATA_RDY: u8 = 0x01;

pub const USER_CTRL_FIFO_EN: u8 = 0x40;
/// FIFO and DMP reset
pub const USER_CTRL_FIFO_RESET: u8 = 0x0C;
/// Gyro X, Y, Z and accel into the FIFO
pub const FIFO_EN_GYRO_ACCEL: u8 = 0x78;

/// One FIFO packet: accel then gyro, three big-endian words each
pub const FIFO_PACKET_LEN: usize = 12;

// ============================================================================
// AK8963 registers
// ============================================================================

pub const AK8963_WIA: u8 = 0x00;
pub const AK8963_ST1: u8 = 0x02;
/// Measurement data, low byte first, followed by ST2
pub const AK8963_HXL: u8 = 0x03;
pub const AK8963_CNTL1: u8 = 0x0A;
/// Fuse ROM sensitivity adjustment X, Y, Z
pub const AK8963_ASAX: u8 = 0x10;

// ============================================================================
// AK8963 register values
// ============================================================================

pub const AK8963_WHO_AM_I_VALUE: u8 = 0x48;

pub const AK8963_ST1_DRDY: u8 = 0x01;
pub const AK8963_ST2_HOFL: u8 = 0x08;

pub const AK8963_MODE_POWER_DOWN: u8 = 0x00;
pub const AK8963_MODE_CONT_MEASURE_1: u8 = 0x02; // 8Hz
pub const AK8963_MODE_CONT_MEASURE_2: u8 = 0x06; // 100Hz
pub const AK8963_MODE_FUSE_ROM: u8 = 0x0F;

pub const AK8963_BIT_14BIT: u8 = 0x00;
pub const AK8963_BIT_16BIT: u8 = 0x10;

//! Default parameters of the servo as built for the Sinara Sampler/Urukul pair.
use fugit::HertzU32 as Hertz;

/// The gateware system clock. All timing constants are in units of its period.
pub const SYS_CLK: Hertz = Hertz::MHz(125);

/// Number of ADC channels.
pub const ADC_CHANNELS: usize = 8;

/// Number of ADC serial data lanes (SDO lines). Each lane carries
/// `ADC_CHANNELS / ADC_LANES` channels back to back.
pub const ADC_LANES: usize = 4;

/// ADC sample width in bits.
pub const ADC_WIDTH: u32 = 16;

/// Minimum CNV high time (LTC2320 tCNVH > 40 ns) in system clock cycles.
pub const ADC_T_CNVH: u32 = 4;

/// Conversion time (LTC2320 tCONV = 450 ns) in system clock cycles.
pub const ADC_T_CONV: u32 = 57;

/// Worst case round trip time of the serial clock to the ADC and the
/// returned data clock, in system clock cycles.
pub const ADC_T_RTT: u32 = 4;

/// IIR state (x0, x1, y1) width in bits.
pub const IIR_STATE: u32 = 25;

/// IIR coefficient width in bits. Two coefficients share one memory word.
pub const IIR_COEFF: u32 = 18;

/// IIR accumulator width in bits.
pub const IIR_ACCU: u32 = 48;

/// Output word width in bits (ftw0, ftw1, pow, asf).
pub const IIR_WORD: u32 = 16;

/// Amplitude scale factor width in bits.
pub const IIR_ASF: u32 = 14;

/// Coefficient scale. Unity gain is `1 << IIR_SHIFT`.
pub const IIR_SHIFT: u32 = 11;

/// Log2 of the number of channels.
pub const IIR_CHANNEL: u32 = 3;

/// Log2 of the number of profiles per channel.
pub const IIR_PROFILE: u32 = 5;

/// AD9910 core clock (Urukul 100 MHz reference, PLL x10).
pub const DDS_SYSCLK: Hertz = Hertz::MHz(1000);

/// DDS SPI frame: instruction byte plus the 64 bit single tone profile.
pub const DDS_WIDTH: u32 = ad9910::FRAME_BITS;

/// DDS serial clock divider. Each half period of SCK lasts this many
/// system clock cycles.
pub const DDS_CLK_DIV: u32 = 1;

/// Delay of the DDS IO_UPDATE strobe after the end of the SPI transfer in
/// system clock cycles.
pub const DDS_IO_UPDATE_DELAY: u32 = 0;

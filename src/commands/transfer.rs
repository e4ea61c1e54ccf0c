//! Data transfer commands

use super::format_hex_dump;
use spidevice_core::{ChipSelect, DataFlow, SpiBackend, SpiDevice};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Print the connection settings and backend limits of an open device
pub fn run_info<B: SpiBackend>(
    dev: &SpiDevice<B>,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let s = dev.connection_settings();

    writeln!(out, "SPI Device Information")?;
    writeln!(out, "======================")?;
    writeln!(out)?;
    writeln!(out, "Bus:             {}", s.bus_id)?;
    writeln!(out, "Chip select:     {}", s.chip_select_line)?;
    writeln!(
        out,
        "Clock:           {} Hz ({} kHz)",
        s.clock_frequency,
        s.clock_frequency / 1000
    )?;
    writeln!(
        out,
        "Mode:            {} ({:?}, {:?})",
        s.mode.number(),
        s.mode.polarity(),
        s.mode.phase()
    )?;
    writeln!(out, "Bits per word:   {}", s.data_bit_length)?;
    let cs = match s.chip_select {
        ChipSelect::ActiveLow => "active low",
        ChipSelect::ActiveHigh => "active high",
        ChipSelect::None => "not driven",
    };
    writeln!(out, "Chip select is:  {}", cs)?;
    let flow = match s.data_flow {
        DataFlow::MsbFirst => "MSB first",
        DataFlow::LsbFirst => "LSB first",
    };
    writeln!(out, "Bit order:       {}", flow)?;
    writeln!(out)?;
    writeln!(out, "Max transfer:    {} bytes", dev.backend().max_transfer_len())?;
    writeln!(out, "Features:        {:?}", dev.backend().features())?;

    Ok(())
}

/// Read `len` bytes and print them or save them to `output`
pub fn run_read<B: SpiBackend>(
    dev: &mut SpiDevice<B>,
    len: usize,
    output: Option<&Path>,
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = if len == 1 {
        vec![dev.read_byte()?]
    } else {
        let mut data = vec![0u8; len];
        dev.read(&mut data)?;
        data
    };

    match output {
        Some(path) => {
            let mut file = File::create(path)?;
            file.write_all(&data)?;
            log::info!("Wrote {} bytes to {:?}", data.len(), path);
        }
        None => write!(out, "{}", format_hex_dump(&data))?,
    }

    Ok(())
}

/// Send `data`, discarding whatever the device returns
pub fn run_write<B: SpiBackend>(
    dev: &mut SpiDevice<B>,
    data: &[u8],
) -> Result<(), Box<dyn std::error::Error>> {
    match data {
        [byte] => dev.write_byte(*byte)?,
        _ => dev.write(data)?,
    }
    log::info!("Sent {} bytes", data.len());
    Ok(())
}

/// Send `data` full duplex and print the bytes received alongside
pub fn run_transfer<B: SpiBackend>(
    dev: &mut SpiDevice<B>,
    data: &[u8],
    out: &mut impl Write,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut received = vec![0u8; data.len()];
    dev.transfer_full_duplex(data, &mut received)?;
    write!(out, "{}", format_hex_dump(&received))?;
    Ok(())
}

/// Load bytes to send from a file
pub fn load_input(path: &Path) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let data = std::fs::read(path).map_err(|e| format!("Failed to read {:?}: {}", path, e))?;
    log::debug!("Loaded {} bytes from {:?}", data.len(), path);
    Ok(data)
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use spidevice_core::ConnectionSettings;
    use spidevice_dummy::{DummyConfig, DummySpi, Transaction};

    #[test]
    fn test_info_shows_settings() {
        let dev = spidevice_dummy::open(DummyConfig::new(
            ConnectionSettings::new(2, 1).with_clock_frequency(1_000_000),
        ))
        .unwrap();
        let mut out = Vec::new();
        run_info(&dev, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Bus:             2"));
        assert!(text.contains("Chip select:     1"));
        assert!(text.contains("1000000 Hz"));
        assert!(text.contains("active low"));
    }

    #[test]
    fn test_read_prints_dump() {
        let backend = DummySpi::new_default().with_responses(&[0xC2, 0x20, 0x18]);
        let mut dev = spidevice_dummy::open_with(backend).unwrap();
        let mut out = Vec::new();
        run_read(&mut dev, 3, None, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0000: C2 20 18\n");
    }

    #[test]
    fn test_write_single_and_multi() {
        let mut dev = spidevice_dummy::open(DummyConfig::default()).unwrap();
        run_write(&mut dev, &[0x06]).unwrap();
        run_write(&mut dev, &[0x02, 0x00, 0x10]).unwrap();
        assert_eq!(
            dev.backend().transactions(),
            &[
                Transaction::Write(vec![0x06]),
                Transaction::Write(vec![0x02, 0x00, 0x10]),
            ]
        );
    }

    #[test]
    fn test_transfer_loopback() {
        let mut dev = spidevice_dummy::open(DummyConfig::default().with_loopback(true)).unwrap();
        let mut out = Vec::new();
        run_transfer(&mut dev, &[0x9F, 0x00], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "0000: 9F 00\n");
    }
}

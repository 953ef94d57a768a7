//! Line-oriented telemetry
//!
//! Every formatter renders one line into a stack `heapless::String` and
//! hands it to a [`SerialSink`]. Lines that do not fit are truncated at the
//! buffer boundary rather than dropped.

use core::fmt::Write;

use heapless::String;
use platform::SerialSink;

/// Longest single telemetry line.
pub const LINE_CAPACITY: usize = 96;

type Line = String<LINE_CAPACITY>;

fn send(sink: &mut (impl SerialSink + ?Sized), line: &Line) {
    sink.send_str(line.as_str());
}

/// `"{:.3}\n"` volts.
pub fn send_voltage(sink: &mut (impl SerialSink + ?Sized), volts: f32) {
    let mut line = Line::new();
    let _ = writeln!(line, "{volts:.3}");
    send(sink, &line);
}

/// `"{:.2}\n"` milliamps.
pub fn send_current(sink: &mut (impl SerialSink + ?Sized), milliamps: f32) {
    let mut line = Line::new();
    let _ = writeln!(line, "{milliamps:.2}");
    send(sink, &line);
}

/// `"{:.2}\n"` milliwatts.
pub fn send_power(sink: &mut (impl SerialSink + ?Sized), milliwatts: f32) {
    let mut line = Line::new();
    let _ = writeln!(line, "{milliwatts:.2}");
    send(sink, &line);
}

/// `prefix:` followed by comma-separated values with 3 decimals.
///
/// An empty prefix omits the colon.
pub fn send_channels(sink: &mut (impl SerialSink + ?Sized), prefix: &str, values: &[f32]) {
    let mut line = Line::new();
    if !prefix.is_empty() {
        let _ = write!(line, "{prefix}:");
    }
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            let _ = line.push(',');
        }
        let _ = write!(line, "{value:.3}");
    }
    let _ = line.push('\n');
    send(sink, &line);
}

/// Bus voltage, current and power as one line.
///
/// With a timestamp the line carries the `ina226` prefix and a fourth field.
pub fn send_ina226(
    sink: &mut (impl SerialSink + ?Sized),
    volts: f32,
    milliamps: f32,
    milliwatts: f32,
    timestamp_ms: Option<u32>,
) {
    match timestamp_ms {
        #[allow(clippy::cast_precision_loss)] // timestamps stay well below 2^24 in a report window
        Some(t) => send_channels(sink, "ina226", &[volts, milliamps, milliwatts, t as f32]),
        None => send_channels(sink, "", &[volts, milliamps, milliwatts]),
    }
}

/// `"adc:{:.4},{}\n"` voltage and timestamp.
pub fn send_adc(sink: &mut (impl SerialSink + ?Sized), volts: f32, timestamp_ms: u32) {
    let mut line = Line::new();
    let _ = writeln!(line, "adc:{volts:.4},{timestamp_ms}");
    send(sink, &line);
}

/// `"{:.2}\n"` volts, the plotter-friendly form.
pub fn send_adc_simple(sink: &mut (impl SerialSink + ?Sized), volts: f32) {
    let mut line = Line::new();
    let _ = writeln!(line, "{volts:.2}");
    send(sink, &line);
}

/// One simple line per buffered sample.
pub fn send_adc_batch(sink: &mut (impl SerialSink + ?Sized), samples: &[f32]) {
    for &volts in samples {
        send_adc_simple(sink, volts);
    }
}

/// Encoder change report, CRLF terminated.
pub fn send_encoder_event(
    sink: &mut (impl SerialSink + ?Sized),
    position: i16,
    volts: f32,
    code: u16,
) {
    let mut line = Line::new();
    let _ = write!(
        line,
        "Encoder: Count={position}, Voltage={volts:.1}V, DAC={code}\r\n"
    );
    send(sink, &line);
}

/// Boot summary of the encoder output, CRLF terminated.
pub fn send_initial_state(sink: &mut (impl SerialSink + ?Sized), position: i16, volts: f32) {
    let mut line = Line::new();
    let _ = write!(line, "Initial: Count={position}, Voltage={volts:.1}V\r\n");
    send(sink, &line);
}

/// `"V:{:.3}\n"` bus voltage from the power monitor.
pub fn send_bus_voltage(sink: &mut (impl SerialSink + ?Sized), volts: f32) {
    let mut line = Line::new();
    let _ = writeln!(line, "V:{volts:.3}");
    send(sink, &line);
}

/// `"I2C_ERR:{}\n"` sensor error code.
pub fn send_bus_error(sink: &mut (impl SerialSink + ?Sized), code: u8) {
    let mut line = Line::new();
    let _ = writeln!(line, "I2C_ERR:{code}");
    send(sink, &line);
}

/// Averaged current detail line, CRLF terminated.
pub fn send_current_detail(
    sink: &mut (impl SerialSink + ?Sized),
    amps: f32,
    volts: f32,
    raw: u16,
    offset_volts: f32,
) {
    let mut line = Line::new();
    let _ = write!(
        line,
        "I={amps:.3}A(avg), V={volts:.3}V, ADC={raw}, Offset={offset_volts:.3}V\r\n"
    );
    send(sink, &line);
}

/// New zero offset and its correction from `nominal_volts`, two CRLF lines.
pub fn send_zero_calibration(
    sink: &mut (impl SerialSink + ?Sized),
    offset_volts: f32,
    nominal_volts: f32,
) {
    let mut line = Line::new();
    let _ = write!(
        line,
        "Zero calibration completed! New offset: {offset_volts:.3}V\r\n"
    );
    send(sink, &line);
    line.clear();
    let _ = write!(
        line,
        "Previous offset was {nominal_volts:.3}V, correction: {:.3}V\r\n",
        offset_volts - nominal_volts
    );
    send(sink, &line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform::mocks::RecordingSerial;

    #[test]
    fn scalar_formats() {
        let mut sink = RecordingSerial::new();
        send_voltage(&mut sink, 1.23456);
        send_current(&mut sink, 12.345);
        send_power(&mut sink, 0.5);
        assert_eq!(sink.lines, ["1.235\n", "12.35\n", "0.50\n"]);
    }

    #[test]
    fn channels_with_and_without_prefix() {
        let mut sink = RecordingSerial::new();
        send_channels(&mut sink, "ch", &[1.0, 2.5]);
        send_channels(&mut sink, "", &[0.125]);
        assert_eq!(sink.lines, ["ch:1.000,2.500\n", "0.125\n"]);
    }

    #[test]
    fn ina226_line_gains_prefix_with_timestamp() {
        let mut sink = RecordingSerial::new();
        send_ina226(&mut sink, 5.0, 100.0, 500.0, None);
        send_ina226(&mut sink, 5.0, 100.0, 500.0, Some(42));
        assert_eq!(
            sink.lines,
            [
                "5.000,100.000,500.000\n",
                "ina226:5.000,100.000,500.000,42.000\n"
            ]
        );
    }

    #[test]
    fn adc_formats() {
        let mut sink = RecordingSerial::new();
        send_adc(&mut sink, 1.65, 1000);
        send_adc_simple(&mut sink, 3.3);
        send_adc_batch(&mut sink, &[0.0, 1.0]);
        assert_eq!(
            sink.lines,
            ["adc:1.6500,1000\n", "3.30\n", "0.00\n", "1.00\n"]
        );
    }

    #[test]
    fn encoder_event_is_crlf_terminated() {
        let mut sink = RecordingSerial::new();
        send_encoder_event(&mut sink, 17, 1.7, 2109);
        assert_eq!(sink.joined(), "Encoder: Count=17, Voltage=1.7V, DAC=2109\r\n");
    }

    #[test]
    fn initial_state_line() {
        let mut sink = RecordingSerial::new();
        send_initial_state(&mut sink, 16, 1.6);
        assert_eq!(sink.lines, ["Initial: Count=16, Voltage=1.6V\r\n"]);
    }

    #[test]
    fn power_monitor_lines() {
        let mut sink = RecordingSerial::new();
        send_bus_voltage(&mut sink, 4.9875);
        send_bus_error(&mut sink, 2);
        assert_eq!(sink.lines, ["V:4.988\n", "I2C_ERR:2\n"]);
    }

    #[test]
    fn current_monitor_lines() {
        let mut sink = RecordingSerial::new();
        send_current_detail(&mut sink, -0.25, 1.625, 2016, 1.65);
        send_zero_calibration(&mut sink, 1.7, 1.65);
        assert_eq!(
            sink.lines,
            [
                "I=-0.250A(avg), V=1.625V, ADC=2016, Offset=1.650V\r\n",
                "Zero calibration completed! New offset: 1.700V\r\n",
                "Previous offset was 1.650V, correction: 0.050V\r\n",
            ]
        );
    }
}

use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;
use wxstation_master::Config;

#[test]
fn load_full_config() -> color_eyre::Result<()> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[link]
port = "/dev/ttyUSB1"
baud_rate = 19200
timeout_ms = 1500
settle_ms = 50

[polling]
interval_secs = 30
pacing_ms = 250
max_attempts = 5

[pressure]
port = "/dev/ttyUSB2"
baud_rate = 9600
timeout_ms = 3000
settle_ms = 100

[logging]
filter = "wxstation_master=debug"
"#
    )?;

    let config = Config::load(file.path())?;
    assert_eq!(config.link.port, "/dev/ttyUSB1");
    assert_eq!(config.link.baud_rate, 19200);
    assert_eq!(config.link.timeout(), Duration::from_millis(1500));
    assert_eq!(config.polling.interval(), Duration::from_secs(30));
    assert_eq!(config.polling.pacing(), Duration::from_millis(250));
    assert_eq!(config.polling.max_attempts, 5);

    let pressure = config.pressure.expect("pressure section");
    assert_eq!(pressure.port, "/dev/ttyUSB2");
    assert_eq!(pressure.timeout(), Duration::from_secs(3));
    assert_eq!(config.logging.filter.as_deref(), Some("wxstation_master=debug"));
    Ok(())
}

#[test]
fn optional_sections_may_be_omitted() -> color_eyre::Result<()> {
    let mut file = NamedTempFile::new()?;
    write!(
        file,
        r#"
[link]
port = "/dev/ttyACM0"
baud_rate = 9600
timeout_ms = 2000
settle_ms = 100

[polling]
interval_secs = 60
pacing_ms = 100
max_attempts = 3
"#
    )?;

    let config = Config::load(file.path())?;
    assert!(config.pressure.is_none());
    assert!(config.logging.filter.is_none());
    Ok(())
}

#[test]
fn missing_section_is_an_error() -> color_eyre::Result<()> {
    let mut file = NamedTempFile::new()?;
    write!(file, "[polling]\ninterval_secs = 60\npacing_ms = 100\nmax_attempts = 3\n")?;

    assert!(Config::load(file.path()).is_err());
    Ok(())
}

#[test]
fn defaults_match_the_station_hardware() {
    let config = Config::default();
    assert_eq!(config.link.port, "/dev/ttyACM0");
    assert_eq!(config.link.baud_rate, 9600);
    assert_eq!(config.polling.interval_secs, 60);
    assert_eq!(config.polling.max_attempts, 3);
    assert!(config.pressure.is_none());
}

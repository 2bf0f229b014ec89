use std::time::Duration;
use ixxat_rs::constant::MODE;
use ixxat_rs::{can::CanMessage, IxxatCan};
use rs_can::{ChannelConfig, Device, DeviceBuilder, Frame, Id};

const CHANNEL: u8 = 0;

fn main() -> anyhow::Result<()> {
    let mut cfg = ChannelConfig::new(500_000);
    cfg.add_other(MODE, Box::new(String::from("11bit,29bit")));
    let mut builder = DeviceBuilder::new("ixxat");
    builder.add_config(CHANNEL.to_string(), cfg);

    let mut device = builder.build::<IxxatCan>()?;
    println!("bus load: {}%", device.bus_load(CHANNEL)?);

    let data = vec![0x02, 0x10, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00];
    let msg = CanMessage::new(Id::from(0x7DFu32), &data)
        .ok_or_else(|| anyhow::anyhow!("invalid frame"))?;
    device.transmit(msg, None)?;

    if let Some(resp) = device.wait_for_id(CHANNEL, 0x7E8u32, Duration::from_millis(500))? {
        println!("{}", resp);
    }

    let results = device.receive(CHANNEL, Some(20))?;
    results.into_iter()
        .for_each(|f| println!("{}", f));

    let frames = device.subscribe("print", Vec::new());
    device.start(Duration::from_millis(10));
    while let Ok(f) = frames.recv_timeout(Duration::from_secs(1)) {
        println!("{}", f);
    }
    device.stop();
    println!("received: {}, errors: {}", device.received_count(), device.error_count());

    device.shutdown();

    Ok(())
}

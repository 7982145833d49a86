use lifx_dash::{Rgba, hsb_to_rgb, kelvin_to_rgb};

pub fn convert_hsb(hue: f64, saturation: f64, brightness: f64) {
    let color = Rgba::from(hsb_to_rgb(hue, saturation, brightness));
    println!("HSB({hue}, {saturation}, {brightness}) -> {color} {}", color.hex());
}

pub fn convert_kelvin(kelvin: u32) {
    let color = Rgba::from(kelvin_to_rgb(kelvin));
    println!("{kelvin}K -> {color} {}", color.hex());
}

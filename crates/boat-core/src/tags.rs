/// Naming of one telemetry channel across sinks and metrics.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    /// Column in the structured sink.
    pub column: &'static str,
    /// Header in the flat sink.
    pub header: &'static str,
    pub metric: &'static str,
}

pub const SPEED_KPH: Tag = Tag {
    column: "speedKPH",
    header: "speedKPH",
    metric: "boat_speed_kph",
};

pub const RPM: Tag = Tag {
    column: "rpm",
    header: "rpm",
    metric: "boat_motor_rpm",
};

pub const BATTERY_VOLTAGE: Tag = Tag {
    column: "batteryVoltage",
    header: "batteryVoltage",
    metric: "boat_battery_voltage_volts",
};

pub const BATTERY_PERCENTAGE: Tag = Tag {
    column: "batteryPercentage",
    header: "batteryPercentage",
    metric: "boat_battery_percent",
};

pub const WIND_SPEED: Tag = Tag {
    column: "windSpeed",
    header: "windSpeed",
    metric: "boat_wind_speed",
};

pub const TEMPERATURE: Tag = Tag {
    column: "temperature",
    header: "temp",
    metric: "boat_temperature_celsius",
};

/// Measurement channels in sink column order.
pub const CHANNELS: [Tag; 6] = [
    SPEED_KPH,
    RPM,
    BATTERY_VOLTAGE,
    BATTERY_PERCENTAGE,
    WIND_SPEED,
    TEMPERATURE,
];

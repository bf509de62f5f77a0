mod objc_bindings;
mod peripheral_manager;

pub use peripheral_manager::CoreBluetoothPeripheral;

#[macro_export]
macro_rules! impl_access_at_offset {
    ($t:ty) => {
        ::paste::paste! {

            impl<P: PortIo> PciConfig<P> {
                pub fn [<read_ $t>](&self, bdf: Bdf, register: u8) -> $t {
                    self.ports.write_u32(PCI_CONFIG_ADDRESS, bdf.config_address(register));
                    self.ports.[<read_ $t>](PCI_CONFIG_DATA + u16::from(register & 0x3))
                }

                pub fn [<write_ $t>](&self, bdf: Bdf, register: u8, value: $t) {
                    self.ports.write_u32(PCI_CONFIG_ADDRESS, bdf.config_address(register));
                    self.ports.[<write_ $t>](PCI_CONFIG_DATA + u16::from(register & 0x3), value)
                }

            }
        }
    };
}

use bitfield_struct::bitfield;
use inspector_layout::{Cursor, LayoutError};

/// PCI Express capability (id 0x10), up to the link status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PciExpress {
    pub capabilities: ExpressCapabilities,
    pub device_capabilities: u32,
    pub device_control: u16,
    pub device_status: u16,
    pub link_capabilities: LinkCapabilities,
    pub link_control: u16,
    pub link_status: LinkStatus,
}

#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct ExpressCapabilities {
    #[bits(4)]
    pub version: u8,
    #[bits(4)]
    pub port_type: u8,
    pub slot_implemented: bool,
    #[bits(5)]
    pub interrupt_message_number: u8,
    #[bits(2)]
    _reserved1: u8,
}

#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct LinkCapabilities {
    #[bits(4)]
    pub max_link_speed: u8,
    #[bits(6)]
    pub max_link_width: u8,
    #[bits(14)]
    _reserved2: u16,
    #[bits(8)]
    pub port_number: u8,
}

#[bitfield(u16)]
#[derive(PartialEq, Eq)]
pub struct LinkStatus {
    #[bits(4)]
    pub current_link_speed: u8,
    #[bits(6)]
    pub negotiated_link_width: u8,
    #[bits(6)]
    _reserved3: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    Endpoint,
    LegacyEndpoint,
    RootComplexIntegratedEndpoint,
    RootComplexEventCollector,
    RootPort,
    UpstreamSwitchPort,
    DownstreamSwitchPort,
    PcieToPciBridge,
    PciToPcieBridge,
    Reserved(u8),
}

impl PciExpress {
    pub(crate) fn decode(c: &mut Cursor<'_>) -> Result<Self, LayoutError> {
        Ok(Self {
            capabilities: ExpressCapabilities::from_bits(c.u16()?),
            device_capabilities: c.u32()?,
            device_control: c.u16()?,
            device_status: c.u16()?,
            link_capabilities: LinkCapabilities::from_bits(c.u32()?),
            link_control: c.u16()?,
            link_status: LinkStatus::from_bits(c.u16()?),
        })
    }

    #[must_use]
    pub const fn port_type(&self) -> PortType {
        match self.capabilities.port_type() {
            0x0 => PortType::Endpoint,
            0x1 => PortType::LegacyEndpoint,
            0x4 => PortType::RootPort,
            0x5 => PortType::UpstreamSwitchPort,
            0x6 => PortType::DownstreamSwitchPort,
            0x7 => PortType::PcieToPciBridge,
            0x8 => PortType::PciToPcieBridge,
            0x9 => PortType::RootComplexIntegratedEndpoint,
            0xA => PortType::RootComplexEventCollector,
            t => PortType::Reserved(t),
        }
    }
}

//! Pure routing of MQTT event loop output
//!
//! The simulator only publishes, so the only incoming packets that matter are the ones that
//! change the connection state.

use crate::transport::LinkEvent;
use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::{mqttbytes::QoS, Event};

/// Pure message routing decisions based on MQTT events
pub struct MessageHandler;

impl MessageHandler {
    /// Route MQTT event to appropriate handler (pure routing decision)
    pub fn route_mqtt_event(event: &Event) -> EventRoute {
        match event {
            Event::Incoming(incoming) => match incoming {
                Packet::ConnAck(_) => EventRoute::ConnectionAcknowledged,
                Packet::Disconnect(disconnect) => EventRoute::Disconnected(format!(
                    "Broker disconnected: {:?}",
                    disconnect.reason_code
                )),
                other => EventRoute::InfrastructureEvent(format!("{other:?}")),
            },
            Event::Outgoing(_) => EventRoute::OutgoingEvent,
        }
    }

    /// Link event to report for a routed event, if any (pure function)
    pub fn link_event(route: &EventRoute) -> Option<LinkEvent> {
        match route {
            EventRoute::ConnectionAcknowledged => Some(LinkEvent::Connected),
            EventRoute::Disconnected(reason) => Some(LinkEvent::Disconnected(reason.clone())),
            EventRoute::InfrastructureEvent(_) | EventRoute::OutgoingEvent => None,
        }
    }

    /// Determine QoS level based on message type (pure function)
    pub fn determine_qos_level(retain: bool) -> QoS {
        match retain {
            true => QoS::AtLeastOnce,
            // Readings are fire-and-forget
            false => QoS::AtMostOnce,
        }
    }
}

/// Routing decisions for MQTT events
#[derive(Debug, Clone, PartialEq)]
pub enum EventRoute {
    /// Connection acknowledged - ready to publish
    ConnectionAcknowledged,
    /// MQTT broker disconnected us
    Disconnected(String),
    /// Infrastructure event (PingResp, PubAck, etc.)
    InfrastructureEvent(String),
    /// Outgoing event (handled automatically)
    OutgoingEvent,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::v5::mqttbytes::v5::{
        ConnAck, ConnectReturnCode, Disconnect, DisconnectReasonCode,
    };

    #[test]
    fn test_route_mqtt_event() {
        let connack = Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
            properties: None,
        }));
        assert_eq!(
            MessageHandler::route_mqtt_event(&connack),
            EventRoute::ConnectionAcknowledged
        );

        let disconnect = Event::Incoming(Packet::Disconnect(Disconnect {
            reason_code: DisconnectReasonCode::NormalDisconnection,
            properties: None,
        }));
        match MessageHandler::route_mqtt_event(&disconnect) {
            EventRoute::Disconnected(reason) => assert!(reason.contains("NormalDisconnection")),
            other => panic!("Expected Disconnected route, got {other:?}"),
        }
    }

    #[test]
    fn test_link_event_mapping() {
        assert_eq!(
            MessageHandler::link_event(&EventRoute::ConnectionAcknowledged),
            Some(LinkEvent::Connected)
        );
        assert_eq!(
            MessageHandler::link_event(&EventRoute::Disconnected("bye".to_string())),
            Some(LinkEvent::Disconnected("bye".to_string()))
        );
        assert_eq!(MessageHandler::link_event(&EventRoute::OutgoingEvent), None);
        assert_eq!(
            MessageHandler::link_event(&EventRoute::InfrastructureEvent("PingResp".to_string())),
            None
        );
    }

    #[test]
    fn test_determine_qos_level() {
        assert_eq!(MessageHandler::determine_qos_level(false), QoS::AtMostOnce);
        assert_eq!(MessageHandler::determine_qos_level(true), QoS::AtLeastOnce);
    }
}
